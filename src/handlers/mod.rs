// Three route tiers: public (no token), protected (access token),
// admin (access token + admin/root role checks in the handlers)
pub mod admin;
pub mod protected;
pub mod public;
