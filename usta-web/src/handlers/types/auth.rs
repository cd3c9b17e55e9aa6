//! Authentication and profile types

use serde::{Deserialize, Serialize};
use usta_applications::AccountView;
use utoipa::ToSchema;

/// Ask for a one-time code
#[derive(Debug, Deserialize, ToSchema)]
pub struct OtpRequest {
    #[schema(example = "+998901234567")]
    pub phone: String,
    /// Role to register with if the phone is new (`client` or `master`)
    #[schema(example = "client")]
    pub role: Option<String>,
}

/// Exchange a one-time code for a session
#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyRequest {
    #[schema(example = "+998901234567")]
    pub phone: String,
    #[schema(example = "123456")]
    pub code: String,
    #[schema(example = "master")]
    pub role: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyResponse {
    /// Bearer token; shown once
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub account: AccountView,
    /// True when this login created the account
    pub registered: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub account: Option<AccountView>,
}

/// Partial profile update; omitted fields stay unchanged
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    #[schema(example = "Bobur")]
    pub name: Option<String>,
    #[schema(example = "plumber")]
    pub profession: Option<String>,
    pub region: Option<String>,
    #[schema(example = "Tashkent")]
    pub city: Option<String>,
    pub bio: Option<String>,
    #[schema(example = 7)]
    pub experience_years: Option<u32>,
}

impl From<UpdateProfileRequest> for usta_applications::ProfileUpdate {
    fn from(request: UpdateProfileRequest) -> Self {
        Self {
            name: request.name,
            profession: request.profession,
            region: request.region,
            city: request.city,
            bio: request.bio,
            experience_years: request.experience_years,
        }
    }
}

/// Directory filters, all exact and case-insensitive
#[derive(Debug, Default, Deserialize, ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MasterQuery {
    pub profession: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

impl From<MasterQuery> for usta_core::MasterFilter {
    fn from(query: MasterQuery) -> Self {
        fn non_blank(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        Self {
            profession: non_blank(query.profession),
            region: non_blank(query.region),
            city: non_blank(query.city),
        }
    }
}
