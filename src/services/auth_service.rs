use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::auth::{
        Claims, LoginRequest, RegisterRequest, StaffLoginRequest, StaffLoginResponse,
        UpdateProfileRequest,
    },
    error::{AppError, AppResult},
    models::CustomerProfile,
    password,
    repository::ProfileFields,
    response::ApiResponse,
    session,
    state::AppState,
    validation::{
        MIN_PASSWORD_LEN, is_valid_email, non_empty, normalize_email, normalize_redirect_path,
    },
};

pub const STAFF_TOKEN_HOURS: i64 = 12;

/// Where the browser goes next and which session its cookies must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub session_id: Uuid,
    pub redirect_to: String,
}

pub async fn register_customer(
    state: &AppState,
    current_session: Option<&str>,
    payload: RegisterRequest,
) -> AppResult<AuthOutcome> {
    let (Some(first_name), Some(last_name), Some(phone)) = (
        non_empty(payload.first_name.as_deref()),
        non_empty(payload.last_name.as_deref()),
        non_empty(payload.phone.as_deref()),
    ) else {
        return Err(AppError::BadRequest(
            "first name, last name and phone are required".into(),
        ));
    };

    let email = normalize_email(payload.email.as_deref().unwrap_or_default());
    if !is_valid_email(&email) {
        return Err(AppError::BadRequest("invalid email address".into()));
    }

    let password = payload.password.as_deref().unwrap_or_default();
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if payload.confirm_password.as_deref() != Some(password) {
        return Err(AppError::BadRequest("passwords do not match".into()));
    }

    let current = current_session.and_then(session::parse_session_id);
    let target_session = resolve_registration_session(state, current, &email).await?;

    let credentials = password::derive(password, None);
    let fields = ProfileFields {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: Some(email.clone()),
        phone: Some(phone.to_string()),
        credentials: Some(credentials),
    };
    let profile = match state
        .repos
        .customers
        .upsert_by_session(target_session, fields)
        .await
    {
        Ok(profile) => profile,
        // Lost a race with another registration for the same email.
        Err(err) if err.is_unique_violation() => return Err(email_taken()),
        Err(err) => return Err(err),
    };

    tracing::info!(session_id = %profile.session_id, "customer registered");
    log_audit(
        state,
        Some(profile.session_id.to_string()),
        "customer_register",
        Some("customer_profiles"),
        Some(serde_json::json!({ "profile_id": profile.id })),
    )
    .await;

    Ok(AuthOutcome {
        session_id: profile.session_id,
        redirect_to: normalize_redirect_path(payload.next.as_deref()),
    })
}

fn email_taken() -> AppError {
    AppError::Conflict("email already used - log in instead".into())
}

/// Picks the session the new credentials are stored under.
///
/// A guest profile already holding this email is adopted; a registered one
/// blocks the registration. A browser whose current session already belongs
/// to another registered account starts a fresh session.
async fn resolve_registration_session(
    state: &AppState,
    current: Option<Uuid>,
    email: &str,
) -> AppResult<Uuid> {
    if let Some(existing) = state.repos.customers.find_by_email(email).await? {
        if existing.credentials().is_some() {
            return Err(email_taken());
        }
        if Some(existing.session_id) != current {
            tracing::debug!(
                from = ?current,
                to = %existing.session_id,
                "registration adopts guest profile session"
            );
        }
        return Ok(existing.session_id);
    }

    let Some(current) = current else {
        return Ok(session::new_session_id());
    };
    match state.repos.customers.find_by_session(current).await? {
        Some(profile) if profile.credentials().is_some() => Ok(session::new_session_id()),
        _ => Ok(current),
    }
}

pub async fn login_customer(state: &AppState, payload: LoginRequest) -> AppResult<AuthOutcome> {
    let email = normalize_email(payload.email.as_deref().unwrap_or_default());
    if !is_valid_email(&email) {
        return Err(AppError::BadRequest("invalid email address".into()));
    }
    let Some(password) = payload.password.as_deref().filter(|p| !p.is_empty()) else {
        return Err(AppError::BadRequest("password is required".into()));
    };

    let profile = state.repos.customers.find_by_email(&email).await?;
    let Some((profile, (hash, salt))) = profile
        .as_ref()
        .and_then(|p| p.credentials().map(|creds| (p, creds)))
    else {
        return Err(AppError::Unauthorized("account not found".into()));
    };

    if !password::verify(password, hash, salt) {
        tracing::info!("customer login rejected");
        return Err(AppError::Unauthorized("invalid email or password".into()));
    }

    tracing::info!(session_id = %profile.session_id, "customer logged in");
    log_audit(
        state,
        Some(profile.session_id.to_string()),
        "customer_login",
        Some("customer_profiles"),
        None,
    )
    .await;

    Ok(AuthOutcome {
        session_id: profile.session_id,
        redirect_to: normalize_redirect_path(payload.next.as_deref()),
    })
}

/// Session of a request that carries both a valid session id and the
/// authentication marker.
pub fn authenticated_session(raw_session: Option<&str>, authenticated: bool) -> AppResult<Uuid> {
    if !authenticated {
        return Err(AppError::Unauthorized("please log in".into()));
    }
    raw_session
        .and_then(session::parse_session_id)
        .ok_or_else(|| AppError::Unauthorized("invalid session".into()))
}

pub async fn get_profile(
    state: &AppState,
    session_id: Uuid,
) -> AppResult<ApiResponse<CustomerProfile>> {
    let profile = state
        .repos
        .customers
        .find_by_session(session_id)
        .await?
        .filter(|p| p.credentials().is_some())
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::ok("Profile", CustomerProfile::from(profile)))
}

pub async fn update_profile(
    state: &AppState,
    session_id: Uuid,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<CustomerProfile>> {
    let existing = state
        .repos
        .customers
        .find_by_session(session_id)
        .await?
        .filter(|p| p.credentials().is_some())
        .ok_or(AppError::NotFound)?;

    let (Some(first_name), Some(last_name), Some(phone)) = (
        non_empty(payload.first_name.as_deref()),
        non_empty(payload.last_name.as_deref()),
        non_empty(payload.phone.as_deref()),
    ) else {
        return Err(AppError::BadRequest(
            "first name, last name and phone are required".into(),
        ));
    };

    let fields = ProfileFields {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: None,
        phone: Some(phone.to_string()),
        credentials: None,
    };
    let profile = state
        .repos
        .customers
        .upsert_by_session(existing.session_id, fields)
        .await?;

    Ok(ApiResponse::ok("Profile updated", CustomerProfile::from(profile)))
}

pub async fn login_staff(
    state: &AppState,
    payload: StaffLoginRequest,
) -> AppResult<ApiResponse<StaffLoginResponse>> {
    let email = normalize_email(&payload.email);
    let staff = state.repos.staff.find_by_email(&email).await?;

    let Some(staff) = staff.filter(|s| {
        password::verify(&payload.password, &s.password_hash, &s.password_salt)
    }) else {
        return Err(AppError::Unauthorized("invalid email or password".into()));
    };

    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(STAFF_TOKEN_HOURS))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: staff.id.to_string(),
        email: staff.email.clone(),
        role: staff.role.clone(),
        exp: expiration.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

    log_audit(
        state,
        Some(staff.email.clone()),
        "staff_login",
        Some("staff_users"),
        None,
    )
    .await;

    Ok(ApiResponse::ok(
        "Logged in",
        StaffLoginResponse {
            token: format!("Bearer {token}"),
        },
    ))
}
