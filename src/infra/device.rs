// ============================================================
// Layer 6 — Device Context
// ============================================================
// Resolved once from --device-ids at startup and threaded through
// the use cases; nothing else decides where tensors live.
//
//   "cpu"   → NdArray backend
//   "0"     → Wgpu, discrete GPU 0
//   "1,2"   → Wgpu, discrete GPU 1 (single-device training; the
//             remaining ids are accepted and reported)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceContext {
    Cpu,
    Gpu { ids: Vec<usize> },
}

impl DeviceContext {
    /// The GPU index training runs on, if any.
    pub fn primary_gpu(&self) -> Option<usize> {
        match self {
            DeviceContext::Cpu => None,
            DeviceContext::Gpu { ids } => ids.first().copied(),
        }
    }

    pub fn wgpu_device(index: usize) -> burn::backend::wgpu::WgpuDevice {
        burn::backend::wgpu::WgpuDevice::DiscreteGpu(index)
    }
}

impl Default for DeviceContext {
    fn default() -> Self {
        DeviceContext::Gpu { ids: vec![0] }
    }
}

impl FromStr for DeviceContext {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("cpu") {
            return Ok(DeviceContext::Cpu);
        }
        if s.is_empty() {
            bail!("Empty device id list");
        }

        let ids = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Malformed device id '{part}' in '{s}'"))
            })
            .collect::<Result<Vec<_>>>()?;

        if ids.len() > 1 {
            tracing::warn!("Several device ids given ({s}); training runs on device {}", ids[0]);
        }
        Ok(DeviceContext::Gpu { ids })
    }
}

impl fmt::Display for DeviceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceContext::Cpu => write!(f, "cpu"),
            DeviceContext::Gpu { ids } => {
                let list: Vec<String> = ids.iter().map(usize::to_string).collect();
                write!(f, "gpu:{}", list.join(","))
            }
        }
    }
}
