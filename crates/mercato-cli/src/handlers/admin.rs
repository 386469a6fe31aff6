//! Account administration.

use mercato_core::User;

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Grant the admin role. Promoting an existing admin is a no-op.
pub async fn promote(ctx: &CliContext, email: &str) -> Result<User, CliError> {
    let user = ctx.app().maintenance().promote_admin(email).await?;
    println!("{} ({}) is now an admin.", user.email, user.id);
    Ok(user)
}
