use std::fmt;

const SEPARATOR: &str = "##";

/// Cache key shared by both ends of the preview channel.
///
/// Built from a version string and either a resource path (`font/include/default.json`) or an item
/// id (`minecraft:diamond_sword`). The key is the plain concatenation. Versions never contain `#`
/// (the protocol and the asset cache both refuse them), so the first separator splits the key and
/// two requests collide only when their inputs are identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey(String);

impl ResourceKey {
    pub fn new(version: &str, path: &str) -> Self {
        Self(format!("{version}{SEPARATOR}{path}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn resource_key(version: &str, path: &str) -> ResourceKey {
    ResourceKey::new(version, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs_yield_identical_keys() {
        let a = resource_key("1.21.4", "textures/font/ascii.png");
        let b = resource_key("1.21.4", "textures/font/ascii.png");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "1.21.4##textures/font/ascii.png");
    }

    #[test]
    fn versions_partition_the_key_space() {
        let a = resource_key("1.20.6", "minecraft:stone");
        let b = resource_key("1.21.4", "minecraft:stone");
        assert_ne!(a, b);
    }
}
