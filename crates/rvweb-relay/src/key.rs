/// One host key event, as the bytes the guest will see.
///
/// Browser terminals hand over key text as a JS string. The guest gets one byte per UTF-16
/// code unit, truncated to the low 8 bits; there is no UTF-8 expansion. The event length is
/// the number of code units (what `key.length` reports on the JS side).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyEvent {
    bytes: Vec<u8>,
}

impl KeyEvent {
    pub fn from_text(key: &str) -> Self {
        Self {
            bytes: key.encode_utf16().map(|unit| unit as u8).collect(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<&str> for KeyEvent {
    fn from(key: &str) -> Self {
        Self::from_text(key)
    }
}
