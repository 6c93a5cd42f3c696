//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;
/// The ID of a transaction.
pub type TransactionId = DatabaseId;
/// The ID of a friendship (or friend request).
pub type FriendshipId = DatabaseId;
/// The ID of a split.
pub type SplitId = DatabaseId;
