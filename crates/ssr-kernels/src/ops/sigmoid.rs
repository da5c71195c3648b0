//! Element-wise logistic sigmoid over `f64`
//!
//! `exp` is the only foreign call. The negation before it and the
//! `1 / (1 + e)` after it are plain FP instructions, so in the streaming
//! variants they sit on either side of the disabled window: the negation
//! consumes straight from `ft0` and the division produces straight into
//! `ft1`.

use super::{core_range, scalar_apply, stream_block, stream_partitioned};
use crate::error::Result;
use crate::math::Exp;
use crate::variant::RepeatFolding;
use ssr_runtime::{
    call_across_boundary, Address, Cluster, CoreContext, FpInstr, FpRegister, FpValue, RegionReport, StreamSession,
};

const ONE: FpInstr = FpInstr::Fli {
    dst: FpRegister::FT2,
    value: FpValue::F64(1.0),
};

const ONE_PLUS: FpInstr = FpInstr::Fadd {
    dst: FpRegister::FA0,
    lhs: FpRegister::FT2,
    rhs: FpRegister::FA0,
};

/// `fa0 = 1 / (1 + exp(-fa0))`
///
/// `ft2` is caller-saved, so the constant is materialized after the call.
fn scalar_sigmoid(core: &mut CoreContext) -> Result<FpRegister> {
    core.exec(FpInstr::Fneg {
        dst: FpRegister::FA0,
        src: FpRegister::FA0,
    })?;
    core.call_foreign(&Exp)?;
    core.exec(ONE)?;
    core.exec(ONE_PLUS)?;
    core.exec(FpInstr::Fdiv {
        dst: FpRegister::FA0,
        lhs: FpRegister::FT2,
        rhs: FpRegister::FA0,
    })?;
    Ok(FpRegister::FA0)
}

fn streamed_sigmoid(s: &mut StreamSession<'_>) -> Result<()> {
    s.exec(FpInstr::Fneg {
        dst: FpRegister::FA0,
        src: FpRegister::FT0,
    })?;
    call_across_boundary(s, &Exp)?;
    s.exec(ONE)?;
    s.exec(ONE_PLUS)?;
    s.exec(FpInstr::Fdiv {
        dst: FpRegister::FT1,
        lhs: FpRegister::FT2,
        rhs: FpRegister::FA0,
    })?;
    Ok(())
}

/// Scalar reference
pub fn baseline(core: &mut CoreContext, input: Address, n: usize, output: Address) -> Result<()> {
    scalar_apply::<f64, _, _>(core, input, output, 0..n, scalar_sigmoid)
}

pub fn ssr(core: &mut CoreContext, input: Address, n: usize, output: Address) -> Result<()> {
    stream_block::<f64, _>(core, input, output, 0, n, streamed_sigmoid)?;
    Ok(())
}

/// Same as [`ssr`]; the `exp` call keeps the body out of the sequencer
pub fn ssr_frep(core: &mut CoreContext, input: Address, n: usize, output: Address) -> Result<RepeatFolding> {
    ssr(core, input, n, output)?;
    Ok(RepeatFolding::NotApplicable {
        reason: "loop body calls exp".to_string(),
    })
}

pub fn parallel(core: &mut CoreContext, input: Address, n: usize, output: Address) -> Result<()> {
    let range = core_range(core, n)?;
    scalar_apply::<f64, _, _>(core, input, output, range.indices(), scalar_sigmoid)
}

pub fn ssr_parallel(core: &mut CoreContext, input: Address, n: usize, output: Address) -> Result<()> {
    stream_partitioned::<f64, _, _>(core, input, n, output, streamed_sigmoid, scalar_sigmoid)
}

pub fn ssr_omp(cluster: &mut Cluster, input: Address, n: usize, output: Address) -> Result<RegionReport<Vec<()>>> {
    cluster.fork_join(|core| ssr_parallel(core, input, n, output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::sigmoid;
    use ssr_runtime::{ClusterConfig, MemoryTier};

    fn inputs(n: usize) -> Vec<f64> {
        (0..n).map(|i| (i as f64 - n as f64 / 2.0) * 0.25).collect()
    }

    #[test]
    fn test_baseline_matches_host_reference() {
        let data = inputs(40);
        let mut cluster = Cluster::new(ClusterConfig::default()).unwrap();
        let input = cluster.upload(MemoryTier::L1, &data).unwrap();
        let output = cluster.alloc::<f64>(MemoryTier::Main, data.len()).unwrap();

        cluster.run_single(|core| baseline(core, input, data.len(), output)).unwrap();
        let expected: Vec<f64> = data.iter().copied().map(sigmoid).collect();
        assert_eq!(cluster.download::<f64>(output, data.len()).unwrap(), expected);
    }

    #[test]
    fn test_streaming_variants_match_baseline() {
        let data = inputs(29);
        let n = data.len();
        let expected: Vec<f64> = data.iter().copied().map(sigmoid).collect();

        let mut cluster = Cluster::new(ClusterConfig::default().with_total_cores(4)).unwrap();
        let input = cluster.upload(MemoryTier::L1, &data).unwrap();

        let single = cluster.alloc::<f64>(MemoryTier::Main, n).unwrap();
        cluster.run_single(|core| ssr(core, input, n, single)).unwrap();
        assert_eq!(cluster.download::<f64>(single, n).unwrap(), expected);

        let spmd = cluster.alloc::<f64>(MemoryTier::Main, n).unwrap();
        cluster.run_spmd(|core| ssr_parallel(core, input, n, spmd)).unwrap();
        assert_eq!(cluster.download::<f64>(spmd, n).unwrap(), expected);

        let forked = cluster.alloc::<f64>(MemoryTier::Main, n).unwrap();
        let report = ssr_omp(&mut cluster, input, n, forked).unwrap();
        assert_eq!(report.per_core_cycles.len(), 3);
        assert_eq!(cluster.download::<f64>(forked, n).unwrap(), expected);
    }

    #[test]
    fn test_frep_reports_not_applicable() {
        let mut cluster = Cluster::new(ClusterConfig::default()).unwrap();
        let input = cluster.upload(MemoryTier::L1, &[0.0f64]).unwrap();
        let output = cluster.alloc::<f64>(MemoryTier::Main, 1).unwrap();
        let report = cluster.run_single(|core| ssr_frep(core, input, 1, output)).unwrap();
        assert_eq!(
            report.value,
            RepeatFolding::NotApplicable {
                reason: "loop body calls exp".to_string()
            }
        );
        assert_eq!(cluster.download::<f64>(output, 1).unwrap(), vec![0.5]);
    }
}
