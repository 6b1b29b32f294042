use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub image_file: String,
    pub image_url: String,
}
