pub(crate) mod unix_ids;
