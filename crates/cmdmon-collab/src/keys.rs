/// Symmetric key material lookup used to authorize `AUTH`-class requests
/// carrying a key ID (§6 "Keys"). Actual key storage/crypto is out of scope
/// for this crate (§1 "Deliberately out of scope"); only the existence
/// check and the `REKEY` reload hook handlers need are modeled here.
pub trait Keys {
    fn contains(&self, key_id: u32) -> bool;

    /// `REKEY` (§4.5 "Housekeeping"): re-read key material from disk.
    fn reload(&mut self) -> std::io::Result<()>;
}

/// A `Keys` implementation that recognizes no keys at all, used where a
/// daemon binding has no NTS/symmetric-key configuration loaded.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullKeys {
    reload_count: usize,
}

impl NullKeys {
    pub fn reload_count(&self) -> usize {
        self.reload_count
    }
}

impl Keys for NullKeys {
    fn contains(&self, _key_id: u32) -> bool {
        false
    }

    fn reload(&mut self) -> std::io::Result<()> {
        self.reload_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_keys_recognizes_nothing() {
        assert!(!NullKeys::default().contains(1));
    }

    #[test]
    fn reload_increments_its_counter() {
        let mut keys = NullKeys::default();
        keys.reload().unwrap();
        assert_eq!(keys.reload_count(), 1);
    }
}
