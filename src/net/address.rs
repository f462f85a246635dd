//! MAC 地址
//!
//! 设备的链路层逻辑地址，创建时分配，生命周期内不变。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::LinkError;

/// 48 位 MAC 地址。文本形式为 `aa:bb:cc:dd:ee:01`（解析时大小写不敏感）。
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 6]);

impl Address {
    /// 广播地址：总是泛洪，交换机从不学习它。
    pub const BROADCAST: Address = Address([0xff; 6]);

    /// 用于演示拓扑的前缀，与 `AA:BB:CC:DD:EE:xx` 风格一致。
    const LAB_PREFIX: [u8; 2] = [0xaa, 0xbb];

    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// 由序号生成一个单播地址：`aa:bb:` + 序号的低 32 位。
    ///
    /// `Address::from_index(3)` 即 `aa:bb:00:00:00:03`。
    pub fn from_index(index: u32) -> Self {
        let [a, b, c, d] = index.to_be_bytes();
        Self([Self::LAB_PREFIX[0], Self::LAB_PREFIX[1], a, b, c, d])
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// I/G 位为 1 的组地址（含广播）。
    pub fn is_group(&self) -> bool {
        self.0[0] & 0x01 == 0x01
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LinkError::InvalidAddress(s.to_string());
        let mut octets = [0u8; 6];
        let mut parts = s.split([':', '-']);
        for slot in octets.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            // from_str_radix 接受前导 '+'，这里只允许两位十六进制数字
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for Address {
    type Error = LinkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}
