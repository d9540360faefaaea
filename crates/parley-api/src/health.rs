use parley_types::api::HEALTH_MESSAGE;

pub async fn health() -> &'static str {
    HEALTH_MESSAGE
}
