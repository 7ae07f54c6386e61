use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::{
    auth::password::hash_password,
    error::AppError,
    state::AppState,
    storage::RESUME_FOLDER,
    users::{
        dto::{
            non_empty, present, LoginRequest, RegisterRequest, UpdatePasswordRequest,
            UpdateProfileRequest,
        },
        form::ResumeFile,
        repo_types::{NewUser, Niches, Resume, Role, User, UserPatch},
    },
};

const INVALID_CREDENTIALS: &str = "Invalid email or password.";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub async fn register(
    st: &AppState,
    req: RegisterRequest,
    resume: Option<ResumeFile>,
) -> Result<User, AppError> {
    let (Some(name), Some(email), Some(phone), Some(address), Some(password), Some(role)) = (
        present(&req.name),
        present(&req.email),
        present(&req.phone),
        present(&req.address),
        present(&req.password),
        present(&req.role),
    ) else {
        warn!("register: missing required fields");
        return Err(AppError::validation("All fields are required."));
    };

    let role: Role = role.parse().map_err(|_| {
        warn!(%role, "register: unknown role");
        AppError::validation("Invalid user role.")
    })?;

    if !is_valid_email(email) {
        warn!(%email, "register: invalid email");
        return Err(AppError::validation("Please provide a valid email."));
    }

    let niches = Niches {
        first_niche: non_empty(req.first_niche),
        second_niche: non_empty(req.second_niche),
        third_niche: non_empty(req.third_niche),
    };
    if role == Role::JobSeeker && !niches.is_complete() {
        warn!(%email, "register: job seeker without niches");
        return Err(AppError::validation(
            "Please provide your preferred job niches.",
        ));
    }

    if st.store.find_by_email(email).await?.is_some() {
        warn!(%email, "register: email already registered");
        return Err(AppError::Conflict("Email is already registered.".into()));
    }

    let resume = match resume {
        Some(file) => Some(upload_resume(st, file).await?),
        None => None,
    };

    let new_user = NewUser {
        name: name.to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
        address: address.to_string(),
        password_hash: hash_password(password)?,
        role,
        niches,
        cover_letter: non_empty(req.cover_letter),
        resume: resume.clone(),
    };

    let user = match st.store.create(new_user).await {
        Ok(u) => u,
        Err(e) => {
            error!(error = %e, %email, "create user failed");
            if let Some(r) = resume {
                discard(st, &r.public_id).await;
            }
            return Err(e.into());
        }
    };

    info!(user_id = %user.id, role = %user.role, "user registered");
    Ok(user)
}

pub async fn login(st: &AppState, req: LoginRequest) -> Result<User, AppError> {
    let (Some(role), Some(email), Some(password)) = (
        present(&req.role),
        present(&req.email),
        present(&req.password),
    ) else {
        warn!("login: missing fields");
        return Err(AppError::validation(
            "Email, password, and role are required.",
        ));
    };

    let Some(found) = st.store.find_by_email_with_password(email).await? else {
        warn!(%email, "login: unknown email");
        return Err(AppError::auth(INVALID_CREDENTIALS));
    };

    if !found.compare_password(password)? {
        warn!(user_id = %found.user.id, "login: invalid password");
        return Err(AppError::auth(INVALID_CREDENTIALS));
    }

    if found.user.role.as_str() != role {
        warn!(user_id = %found.user.id, %role, "login: role mismatch");
        return Err(AppError::auth("Invalid user role."));
    }

    info!(user_id = %found.user.id, "user logged in");
    Ok(found.user)
}

/// Applies a profile patch. Omitted fields keep their stored value.
///
/// A new résumé is uploaded and persisted before the previous object is
/// destroyed, so a failed upload never leaves the user pointing at a deleted file.
pub async fn update_profile(
    st: &AppState,
    current: &User,
    req: UpdateProfileRequest,
    resume: Option<ResumeFile>,
) -> Result<User, AppError> {
    let niches = Niches {
        first_niche: non_empty(req.first_niche),
        second_niche: non_empty(req.second_niche),
        third_niche: non_empty(req.third_niche),
    };
    if current.role == Role::JobSeeker && !niches.is_complete() {
        warn!(user_id = %current.id, "update_profile: incomplete niches");
        return Err(AppError::validation(
            "Please provide your all preferred job niches.",
        ));
    }

    let email = non_empty(req.email);
    if let Some(email) = email.as_deref().filter(|e| !is_valid_email(e)) {
        warn!(%email, "update_profile: invalid email");
        return Err(AppError::validation("Please provide a valid email."));
    }

    let mut patch = UserPatch {
        name: non_empty(req.name),
        email,
        phone: non_empty(req.phone),
        address: non_empty(req.address),
        cover_letter: req.cover_letter,
        niches,
        resume: None,
    };

    let previous = current.resume.as_ref().map(|r| r.public_id.clone());
    if let Some(file) = resume {
        patch.resume = Some(upload_resume(st, file).await?);
    }
    let replacement = patch.resume.as_ref().map(|r| r.public_id.clone());

    let updated = match st.store.update_by_id(current.id, patch).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(user_id = %current.id, "update_profile: user vanished");
            if let Some(id) = replacement {
                discard(st, &id).await;
            }
            return Err(AppError::unauthenticated());
        }
        Err(e) => {
            error!(error = %e, user_id = %current.id, "update user failed");
            if let Some(id) = replacement {
                discard(st, &id).await;
            }
            return Err(e.into());
        }
    };

    if let (Some(old), Some(_)) = (previous, replacement) {
        discard(st, &old).await;
    }

    info!(user_id = %updated.id, "profile updated");
    Ok(updated)
}

pub async fn update_password(
    st: &AppState,
    current: &User,
    req: UpdatePasswordRequest,
) -> Result<User, AppError> {
    let (Some(old), Some(new), Some(confirm)) = (
        present(&req.old_password),
        present(&req.new_password),
        present(&req.confirm_password),
    ) else {
        return Err(AppError::validation(
            "Old password, new password and confirm password are required.",
        ));
    };

    let Some(found) = st.store.find_by_id_with_password(current.id).await? else {
        return Err(AppError::unauthenticated());
    };

    if !found.compare_password(old)? {
        warn!(user_id = %current.id, "update_password: old password mismatch");
        return Err(AppError::auth("Old password is incorrect."));
    }

    if new != confirm {
        return Err(AppError::validation(
            "New password & confirm password do not match.",
        ));
    }

    let hash = hash_password(new)?;
    st.store.set_password(found.user.id, &hash).await?;

    info!(user_id = %found.user.id, "password updated");
    Ok(found.user)
}

async fn upload_resume(st: &AppState, file: ResumeFile) -> Result<Resume, AppError> {
    debug!(
        file_name = ?file.file_name,
        content_type = %file.content_type,
        size = file.body.len(),
        "uploading resume"
    );
    let uploaded = st
        .files
        .upload(file.body, &file.content_type, RESUME_FOLDER)
        .await
        .map_err(|e| {
            error!(error = ?e, "resume upload failed");
            AppError::Upload("Failed to upload resume".into())
        })?;

    if uploaded.public_id.is_empty() || uploaded.secure_url.is_empty() {
        error!("file host returned an empty upload response");
        return Err(AppError::Upload("Failed to upload resume to cloud.".into()));
    }

    info!(public_id = %uploaded.public_id, "resume uploaded");
    Ok(Resume {
        public_id: uploaded.public_id,
        url: uploaded.secure_url,
    })
}

/// Best-effort delete; a failure only leaves an orphaned object behind.
async fn discard(st: &AppState, public_id: &str) {
    if let Err(e) = st.files.destroy(public_id).await {
        warn!(error = %e, %public_id, "failed to destroy stored file");
    }
}
