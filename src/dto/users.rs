use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Profile, Subscription};

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProfileList {
    #[schema(value_type = Vec<Profile>)]
    pub items: Vec<Profile>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct SubscriptionList {
    #[schema(value_type = Vec<Subscription>)]
    pub items: Vec<Subscription>,
}
