/// A record that can be matched against a previously imported copy.
pub trait SyncableModel {
    /// Stable identifier of the record in the source system.
    fn import_id(&self) -> &str;

    /// Cheap fingerprint of the record's content, usually [`weak_hash`] of
    /// some canonical rendering.
    fn import_hash(&self) -> String;
}

/// 16 hex digits: a 31-multiplier hash over UTF-16 code units, then the
/// UTF-16 length.
///
/// Not collision resistant. Only useful for spotting changed records.
pub fn weak_hash(value: &str) -> String {
    let mut hash: i32 = 0;
    let mut length: u32 = 0;
    for unit in value.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(i32::from(unit));
        length = length.wrapping_add(1);
    }
    format!("{hash:08x}{length:08x}")
}
