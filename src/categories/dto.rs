use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
}
