//! Registration, login and user listing.

use chrono::Utc;

use crate::auth::{self, TokenService};
use crate::error::{TrackerError, TrackerResult};
use crate::models::user::{Credentials, NewUser, TokenResponse, User, UserProfile};
use crate::store::{Database, Filter};

fn token_response(tokens: &TokenService, user: &User) -> TrackerResult<TokenResponse> {
    Ok(TokenResponse {
        access_token: tokens.issue(user)?,
        token_type: "bearer".to_string(),
        user: UserProfile::from(user),
    })
}

pub async fn find_by_email(db: &Database, email: &str) -> TrackerResult<Option<User>> {
    Ok(db
        .users
        .list(&Filter::new().eq("email", email))
        .await?
        .into_iter()
        .next())
}

/// Create an account and sign it in.
pub async fn register(
    db: &Database,
    tokens: &TokenService,
    bcrypt_cost: u32,
    request: NewUser,
) -> TrackerResult<TokenResponse> {
    request.validate()?;
    if find_by_email(db, &request.email).await?.is_some() {
        crate::metrics::auth_attempt("register", "duplicate");
        return Err(TrackerError::Conflict("Email already registered".into()));
    }

    let password_hash = auth::hash_password(request.password, bcrypt_cost).await?;
    let user = User {
        id: crate::models::new_id(),
        email: request.email,
        name: request.name,
        role: request.role,
        clearance_level: request.clearance_level,
        department: request.department,
        rank: request.rank,
        can_delegate: false,
        delegated_to: None,
        password_hash,
        created_at: Utc::now(),
    };
    let user = db.users.insert(user).await.map_err(|e| match e {
        TrackerError::Conflict(_) => TrackerError::Conflict("Email already registered".into()),
        other => other,
    })?;

    crate::metrics::auth_attempt("register", "success");
    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User registered");
    token_response(tokens, &user)
}

pub async fn login(
    db: &Database,
    tokens: &TokenService,
    credentials: Credentials,
) -> TrackerResult<TokenResponse> {
    let invalid = || TrackerError::Unauthorized("Invalid credentials".into());

    let Some(user) = find_by_email(db, &credentials.email).await? else {
        crate::metrics::auth_attempt("login", "failure");
        return Err(invalid());
    };
    if !auth::verify_password(credentials.password, user.password_hash.clone()).await? {
        crate::metrics::auth_attempt("login", "failure");
        tracing::debug!(user_id = %user.id, "Login rejected");
        return Err(invalid());
    }

    crate::metrics::auth_attempt("login", "success");
    token_response(tokens, &user)
}

pub async fn list_users(db: &Database) -> TrackerResult<Vec<UserProfile>> {
    Ok(db
        .users
        .list(&Filter::new())
        .await?
        .iter()
        .map(UserProfile::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::clearance::Clearance;
    use crate::models::user::Role;

    fn request(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password: "password123".into(),
            name: "Capt. Sharma".into(),
            role: Role::User,
            clearance_level: Clearance::Confidential,
            department: None,
            rank: None,
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let db = Database::in_memory();
        let tokens = TokenService::new("secret", 24);

        let registered = register(&db, &tokens, 4, request("capt@defense.gov"))
            .await
            .unwrap();
        assert_eq!(registered.token_type, "bearer");
        let claims = tokens.verify(&registered.access_token).unwrap();
        assert_eq!(claims.sub, registered.user.id);

        let credentials = Credentials {
            email: "capt@defense.gov".into(),
            password: "password123".into(),
        };
        let logged_in = login(&db, &tokens, credentials).await.unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let db = Database::in_memory();
        let tokens = TokenService::new("secret", 24);
        register(&db, &tokens, 4, request("dup@defense.gov")).await.unwrap();
        let err = register(&db, &tokens, 4, request("dup@defense.gov"))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::Conflict(_)));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let db = Database::in_memory();
        let tokens = TokenService::new("secret", 24);
        register(&db, &tokens, 4, request("a@defense.gov")).await.unwrap();

        for (email, password) in [("a@defense.gov", "wrong-pass"), ("b@defense.gov", "password123")] {
            let err = login(
                &db,
                &tokens,
                Credentials {
                    email: email.into(),
                    password: password.into(),
                },
            )
            .await
            .unwrap_err();
            assert_eq!(err.to_string(), "Invalid credentials");
        }
    }
}
