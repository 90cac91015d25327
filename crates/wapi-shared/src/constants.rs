/// Application name
pub const APP_NAME: &str = "Wapi Na Lini";

/// Content shown in place of a soft-deleted message
pub const DELETED_PLACEHOLDER: &str = "This message was deleted";

/// Display name used when the peer lookup fails
pub const FALLBACK_PEER_NAME: &str = "Friend";

/// Lifetime of a transient alert in seconds
pub const ALERT_TTL_SECS: u64 = 6;

/// Top-level collection holding one document per conversation
pub const CHATS_COLLECTION: &str = "chats";

/// Sub-collection of a conversation holding its messages
pub const MESSAGES_COLLECTION: &str = "messages";

/// Flat collection of notification records
pub const NOTIFICATIONS_COLLECTION: &str = "notifications";

/// Separator between the two sorted ids of a conversation key
pub const CONVERSATION_KEY_SEPARATOR: char = '_';

/// Ticket price used when the catalog has no price range
pub const DEFAULT_TICKET_PRICE: f64 = 100.0;

/// Payment amount used when the event could not be loaded
pub const FALLBACK_PAYMENT_AMOUNT: f64 = 1000.0;

/// Image shown for catalog events without artwork
pub const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/800x300?text=No+Image";

/// Keyword the landing page searches for by default
pub const DEFAULT_EVENT_KEYWORD: &str = "music";

/// Events requested per catalog page
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Country prefix M-Pesa numbers are normalized to
pub const MPESA_COUNTRY_PREFIX: &str = "254";
