use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug)]
pub struct RegisterUserPayload {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct GetUserParams {
    pub user_id: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct BecomeInstructorPayload {
    pub user_id: i64,
}
