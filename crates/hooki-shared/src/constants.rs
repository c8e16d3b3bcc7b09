/// Application name
pub const APP_NAME: &str = "Hooki";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 3000;

/// Default search radius for posts, in meters
pub const DEFAULT_POST_RADIUS_M: f64 = 1000.0;

/// Default search radius for nearby users, in meters
pub const DEFAULT_USER_RADIUS_M: f64 = 500.0;

/// Maximum chat message length in characters
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Maximum post / reply length in characters
pub const MAX_POST_LEN: usize = 2000;

/// Display name used when a post author has no profile
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// Separator between the two sorted user ids of a conversation id
pub const CONVERSATION_ID_SEPARATOR: char = '_';

/// Escapes a literal separator (or escape) inside a user id
pub const CONVERSATION_ID_ESCAPE: char = '\\';
