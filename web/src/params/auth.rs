use serde::Deserialize;
use utoipa::ToSchema;

/// Body of the code-exchange request.
///
/// Missing fields deserialize to empty strings and are rejected by the login
/// flow as a bad request, matching the 400-on-missing-code contract.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExchangeParams {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub state: String,
}
