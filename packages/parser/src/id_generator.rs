use crc32fast::Hasher;

/// Derive a stable seed from a template identifier using CRC32
pub fn get_template_seed(template_id: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(b"template://");
    hasher.update(template_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential ID generator for nodes within one editing session
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    count: u32,
}

impl IdGenerator {
    pub fn new(template_id: &str) -> Self {
        Self {
            seed: get_template_seed(template_id),
            count: 0,
        }
    }

    pub fn from_seed(seed: String) -> Self {
        Self { seed, count: 0 }
    }

    /// Generate next sequential ID
    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}", self.seed, self.count)
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new("untitled")
    }
}
