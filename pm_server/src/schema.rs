//! Diesel table definitions for the PostgreSQL document store.
//!
//! A single table holds every collection; `(collection, id)` is the key and
//! `data` carries the JSON document.

diesel::table! {
    pm_documents (collection, id) {
        collection -> Varchar,
        id -> Varchar,
        version -> Int8,
        seq -> Int8,
        data -> Jsonb,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}
