//! 主机端缓冲区
//!
//! [`BufferSize`] 是经过校验的元素数，[`HostBuffer`] 是一次生成、
//! 在所有写入操作中复用的随机 f64 数组。

use rand::SeedableRng;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;

use crate::error::{BenchError, BenchResult};

/// 缓冲区元素数的下限（不含）
pub const MIN_BUFFER_ELEMENTS: u64 = 8;

/// 每个元素的字节数
pub const ELEMENT_BYTES: usize = std::mem::size_of::<f64>();

/// 缓冲区元素数，保证大于 [`MIN_BUFFER_ELEMENTS`] 且字节数不溢出
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferSize(usize);

impl BufferSize {
    pub fn new(elements: u64) -> BenchResult<Self> {
        if elements <= MIN_BUFFER_ELEMENTS {
            return Err(BenchError::BufferTooSmall {
                requested: elements,
            });
        }
        usize::try_from(elements)
            .ok()
            .filter(|n| n.checked_mul(ELEMENT_BYTES).is_some())
            .map(Self)
            .ok_or(BenchError::BufferTooLarge {
                requested: elements,
            })
    }

    /// 元素数
    pub fn elements(self) -> usize {
        self.0
    }

    /// 单次传输的字节数
    pub fn bytes(self) -> usize {
        self.0 * ELEMENT_BYTES
    }
}

impl std::fmt::Display for BufferSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 主机端数据缓冲区
#[derive(Debug, Clone, PartialEq)]
pub struct HostBuffer {
    data: Vec<f64>,
}

impl HostBuffer {
    /// 用熵源播种的随机数填充 [0, 1) 均匀分布的数据
    pub fn random(size: BufferSize) -> Self {
        let mut rng = StdRng::from_entropy();
        let dist = Uniform::new(0.0, 1.0);
        let data = dist.sample_iter(&mut rng).take(size.elements()).collect();
        Self { data }
    }

    pub fn from_vec(data: Vec<f64>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn byte_len(&self) -> usize {
        self.data.len() * ELEMENT_BYTES
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_buffer_size_bounds() {
        assert!(BufferSize::new(8).is_err());
        assert!(BufferSize::new(0).is_err());
        let size = BufferSize::new(9).unwrap();
        assert_eq!(size.elements(), 9);
        assert_eq!(size.bytes(), 72);
    }

    #[test]
    fn test_buffer_size_rejects_byte_overflow() {
        assert!(matches!(
            BufferSize::new(u64::MAX),
            Err(BenchError::BufferTooLarge { requested: u64::MAX })
        ));
        let first_overflow = (usize::MAX / ELEMENT_BYTES) as u64 + 1;
        assert!(matches!(
            BufferSize::new(first_overflow),
            Err(BenchError::BufferTooLarge { .. })
        ));
        assert!(BufferSize::new(first_overflow - 1).is_ok());
    }

    #[test]
    fn test_random_buffer_range() {
        let buffer = HostBuffer::random(BufferSize::new(1024).unwrap());
        assert_eq!(buffer.len(), 1024);
        assert_eq!(buffer.byte_len(), 8192);
        assert!(buffer.as_slice().iter().all(|v| (0.0..1.0).contains(v)));
    }

    proptest! {
        #[test]
        fn prop_buffer_size_validation(n in 0u64..100_000) {
            let result = BufferSize::new(n);
            prop_assert_eq!(result.is_ok(), n > MIN_BUFFER_ELEMENTS);
            if let Ok(size) = result {
                prop_assert_eq!(HostBuffer::random(size).len() as u64, n);
            }
        }
    }
}
