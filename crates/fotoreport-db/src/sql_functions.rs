use diesel::sql_types::Text;

diesel::define_sql_function! {
    /// The SQL `lower` function, used for case-insensitive handle lookups.
    fn lower(value: Text) -> Text;
}
