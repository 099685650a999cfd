// Accounts and bearer-token authentication.
// Passwords are Argon2id hashes; tokens are HS256 JWTs with a `typ` claim so
// refresh tokens cannot be used as access tokens.

pub mod extractor;
pub mod handlers;
pub mod password;
pub mod tokens;
pub mod users;
pub mod validation;
