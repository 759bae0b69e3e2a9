/// A named anonymous drop box tied to one server channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Mailbox {
    /// Database row id. Feeds into sender identity hashes, so row ids
    /// must stay stable for a mailbox's lifetime.
    pub id: i64,
    pub guild_id: u64,
    /// Unique per server, case-insensitive.
    pub name: String,
    /// The channel relayed mail is posted to.
    pub channel_id: u64,
}

/// A piece of mail ready to relay: the target channel, the anonymized
/// sender tag, and the contents.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub channel_id: u64,
    /// Short hex prefix of the sender's identity hash. Stable per
    /// sender and mailbox, but not reversible to a user id.
    pub sender_tag: String,
    pub contents: String,
}
