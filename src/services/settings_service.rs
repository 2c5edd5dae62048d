use crate::{
    audit::log_audit,
    error::{AppError, AppResult},
    middleware::auth::{AdminUser, ensure_admin},
    models::StoreSettings,
    response::ApiResponse,
    state::AppState,
    validation::{is_valid_email, non_empty, normalize_email},
};

/// Stored settings, or the defaults before an admin ever saved them.
pub async fn load(state: &AppState) -> AppResult<StoreSettings> {
    Ok(state
        .repos
        .settings
        .load()
        .await?
        .map(StoreSettings::from)
        .unwrap_or_default())
}

pub async fn get_settings(state: &AppState) -> AppResult<ApiResponse<StoreSettings>> {
    Ok(ApiResponse::ok("Ok", load(state).await?))
}

fn clean(value: Option<String>) -> Option<String> {
    non_empty(value.as_deref()).map(str::to_string)
}

fn validate(settings: StoreSettings) -> AppResult<StoreSettings> {
    let store_name = non_empty(Some(&settings.store_name))
        .ok_or_else(|| AppError::BadRequest("store name is required".into()))?
        .to_string();

    let contact_email = clean(settings.contact_email).map(|e| normalize_email(&e));
    if contact_email.as_deref().is_some_and(|e| !is_valid_email(e)) {
        return Err(AppError::BadRequest("invalid contact email".into()));
    }

    Ok(StoreSettings {
        store_name,
        contact_phone: clean(settings.contact_phone),
        contact_email,
        address: clean(settings.address),
        facebook_url: clean(settings.facebook_url),
        instagram_url: clean(settings.instagram_url),
    })
}

pub async fn save_settings(
    state: &AppState,
    user: &AdminUser,
    payload: StoreSettings,
) -> AppResult<ApiResponse<StoreSettings>> {
    ensure_admin(user)?;
    let settings = validate(payload)?;
    let saved = state.repos.settings.save(settings).await?;

    log_audit(
        state,
        Some(user.email.clone()),
        "settings_save",
        Some("store_settings"),
        None,
    )
    .await;

    Ok(ApiResponse::ok("Settings saved", StoreSettings::from(saved)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blanks_become_none() {
        let settings = validate(StoreSettings {
            store_name: "  PC Store DZ ".into(),
            contact_phone: Some("   ".into()),
            contact_email: Some(" Contact@Store.DZ ".into()),
            ..StoreSettings::default()
        })
        .unwrap();
        assert_eq!(settings.store_name, "PC Store DZ");
        assert_eq!(settings.contact_phone, None);
        assert_eq!(settings.contact_email.as_deref(), Some("contact@store.dz"));
    }

    #[test]
    fn rejects_empty_name_and_bad_email() {
        assert!(validate(StoreSettings {
            store_name: " ".into(),
            ..StoreSettings::default()
        })
        .is_err());
        assert!(validate(StoreSettings {
            contact_email: Some("nope".into()),
            ..StoreSettings::default()
        })
        .is_err());
    }
}
