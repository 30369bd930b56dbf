//! Static configuration for the room engine: board dimension, item
//! templates, and flavor-message pools.
//!
//! These are kept as an immutable configuration record rather than module
//! globals so tests can construct engines with overridden values instead
//! of depending on hidden global state.

/// Inclusive board dimension: cells range over `0..=DIMENSION` on both axes.
pub const DIMENSION: u32 = 8;

/// The fixed cell that always holds a chest, regardless of the random
/// placement below.
pub const FIXED_CHEST_POS: (u32, u32) = (1, 1);

/// A template for one kind of interactive item.
#[derive(Debug, Clone, Copy)]
pub struct ItemTemplate {
    pub name: &'static str,
    pub uses: u32,
    pub use_message: &'static str,
    pub empty_message: &'static str,
    pub conflict_message: &'static str,
}

/// The fixed pool of item kinds a freshly-constructed room chooses from
/// for its one random placement.
pub const ITEM_TEMPLATES: &[ItemTemplate] = &[
    ItemTemplate {
        name: "chest",
        uses: 10,
        use_message: "you put your hand in the box and get a surprise",
        empty_message: "you put your hand in an empty box",
        conflict_message: "you put your hand in the box and feel someone else's hand",
    },
    ItemTemplate {
        name: "fire",
        uses: 5,
        use_message: "ow thats hot",
        empty_message: "someone cooked here",
        conflict_message: "you approach the fire but it is too crowded and you cannot find a spot",
    },
];

/// The template used for the fixed chest at [`FIXED_CHEST_POS`].
pub const FIXED_CHEST_TEMPLATE: ItemTemplate = ITEM_TEMPLATES[0];

/// Messages returned by `interact` when nothing is at the client's cell
/// and no other client is there either.
pub const INTERACT_FAIL_MESSAGES: &[&str] = &[
    "you tried but there was nothing there",
    "you reach out and are disappointed",
    "you interact with the floor",
    "you tried to become one with the floor",
    "slow it down, not right now",
];

/// Templates for `interact` when nothing is at the client's cell but other
/// clients are. Each contains the literal placeholder `{collided_users}`,
/// replaced with a grammar-joined list of the colliding clients' ids.
pub const INTERACT_ON_OTHER_USER: &[&str] = &[
    "You look at {collided_users} awkwardly",
    "{collided_users} stare at you, you cant help but notice their concerned looks",
    "{collided_users} turn to look at you",
    "...hi!",
    "WHAT ARE YOU LOOKING AT?!?",
];
