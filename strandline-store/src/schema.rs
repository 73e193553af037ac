diesel::table! {
    /// The persisted doubly-linked list's single table. Every row is one node;
    /// `prev`/`next` are nullable self-referencing foreign keys.
    nodes (id) {
        /// The node's id (UUID v4).
        id -> Uuid,
        /// The predecessor's id, or `NULL` if this is the head.
        prev -> Nullable<Uuid>,
        /// The successor's id, or `NULL` if this is the tail.
        next -> Nullable<Uuid>,
        /// Optimistic-lock version, incremented by one on every mutation.
        version -> Bigint,
    }
}
