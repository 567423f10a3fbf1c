//! OAuth 2.0 token endpoint logic.
//!
//! - [`ClientAuthenticator`] - client authentication (RFC 6749 §2.3)
//! - [`PkceValidator`] - PKCE challenges (RFC 7636)
//! - [`GrantHandlerDispatcher`] and the grant handlers
//! - [`TokenRequest`], [`TokenResponse`], [`TokenErrorResponse`]

pub mod client_auth;
pub mod grants;
pub mod pkce;
pub mod token;

pub use client_auth::{
    AuthenticatedClient, ClientAuthenticator, TokenEndpointAuthMethod, parse_basic_auth,
};
pub use grants::{
    AuthorizationCodeGrantHandler, ClientCredentialsGrantHandler, GrantContext, GrantHandler,
    GrantHandlerDispatcher, RefreshTokenGrantHandler,
};
pub use pkce::{PkceMethod, PkceValidator};
pub use token::{TokenErrorResponse, TokenRequest, TokenResponse};
