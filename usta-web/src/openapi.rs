//! OpenAPI document for the Usta API

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::error::ErrorBody;
use crate::handlers::{
    CreateRequestBody, HealthResponse, MasterQuery, MeResponse, OtpRequest, SuccessResponse,
    UpdateProfileRequest, UpdateStatusBody, VerifyRequest, VerifyResponse,
};
use usta_applications::AccountView;
use usta_core::{MasterProfile, PhoneNumber, RequestStatus, Role, ServiceRequest};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Usta API",
        version = "0.1.0",
        description = "Services marketplace: phone login, master directory and service requests",
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        crate::handlers::health_check,
        crate::handlers::request_otp,
        crate::handlers::verify_otp,
        crate::handlers::me,
        crate::handlers::logout,
        crate::handlers::update_profile,
        crate::handlers::list_masters,
        crate::handlers::get_master,
        crate::handlers::create_request,
        crate::handlers::list_requests,
        crate::handlers::get_request,
        crate::handlers::set_status,
    ),
    components(
        schemas(
            ErrorBody,
            HealthResponse,
            SuccessResponse,
            OtpRequest,
            VerifyRequest,
            VerifyResponse,
            MeResponse,
            UpdateProfileRequest,
            MasterQuery,
            CreateRequestBody,
            UpdateStatusBody,
            AccountView,
            MasterProfile,
            ServiceRequest,
            PhoneNumber,
            Role,
            RequestStatus,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Auth", description = "One-time code login and sessions"),
        (name = "Profile", description = "Own profile management"),
        (name = "Directory", description = "Master directory"),
        (name = "Requests", description = "Service request lifecycle"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Bearer session tokens
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

pub fn api_doc() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Get the OpenAPI document as pretty JSON
pub fn get_openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}
