use serde::{Deserialize, Serialize};

/// A user eligible to receive generated email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub country: String,
    pub investment_goals: String,
    pub risk_tolerance: String,
    pub preferred_industry: String,
}

/// Payload of the `app/user.created` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpEvent {
    pub email: String,
    pub name: String,
    #[serde(flatten)]
    pub profile: UserProfile,
}
