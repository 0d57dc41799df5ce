//! Diesel schema for task lifecycle persistence.

diesel::table! {
    /// Task descriptions.
    tasks (id) {
        /// Store-assigned task identifier.
        id -> Int8,
        /// Human-readable task name.
        #[max_length = 255]
        name -> Varchar,
        /// Integer task kind discriminator.
        kind -> Int8,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Optional free-text description.
        description -> Nullable<Text>,
        /// Opaque payload interpreted by consumers.
        payload -> Text,
    }
}

diesel::table! {
    /// Mutable task statuses, one row per task.
    task_statuses (id) {
        /// Identifier shared with the owning task.
        id -> Int8,
        /// Integer status code.
        status -> Int2,
        /// Completion percentage.
        progress -> Int2,
        /// First transition out of not-started.
        start_time -> Nullable<Timestamptz>,
        /// Latest mutation.
        update_time -> Nullable<Timestamptz>,
        /// Whether the task may be selected.
        enabled -> Bool,
        /// Worker that claimed the task.
        #[max_length = 255]
        worker -> Nullable<Varchar>,
        /// Optimistic-concurrency stamp.
        version -> Int8,
    }
}
