/// A lightweight, serializable snapshot of the strip's scroll state.
///
/// With `feature = "serde"`, this type implements `Serialize`/`Deserialize`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollState {
    pub content_offset: f64,
    /// A user drag/fling is in progress.
    pub is_user_driven: bool,
    /// An animated `move_to_item` is in progress.
    pub is_programmatic_move: bool,
    pub last_known_item_index: usize,
    /// How far the content offset has travelled into `last_known_item_index`'s span, `0.0..1.0`.
    pub fractional_position_within_item: f64,
}
