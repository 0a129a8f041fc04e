use crate::error::ShaderCompileError;
use crate::spirv::SpirvModule;
use shadert_common::TargetApi;
use spirv_tools::error::{Message, MessageLevel};
use spirv_tools::opt::Optimizer;
use spirv_tools::TargetEnv;

/// The optimization passes registered for a run.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PassSet {
    /// Performance passes only.
    Performance,
    /// Size, performance and legalization passes.
    Full,
}

/// The SPIR-V environment for a Vulkan target version.
///
/// Versions `10` through `15` select universal SPIR-V 1.0 through 1.5.
pub fn target_env(version: u32) -> Result<TargetEnv, ShaderCompileError> {
    Ok(match version {
        10 => TargetEnv::Universal_1_0,
        11 => TargetEnv::Universal_1_1,
        12 => TargetEnv::Universal_1_2,
        13 => TargetEnv::Universal_1_3,
        14 => TargetEnv::Universal_1_4,
        15 => TargetEnv::Universal_1_5,
        _ => {
            return Err(ShaderCompileError::UnsupportedVersion {
                target: TargetApi::Vulkan,
                version,
            })
        }
    })
}

/// Optimize a module for the Vulkan target version with every pass group.
pub fn optimize(module: &SpirvModule, version: u32) -> Result<SpirvModule, ShaderCompileError> {
    run_passes(module, target_env(version)?, PassSet::Full)
}

/// Run the passes of `passes` over `module`.
///
/// Any diagnostic at error severity fails the run. Lesser diagnostics are discarded.
pub fn run_passes(
    module: &SpirvModule,
    env: TargetEnv,
    passes: PassSet,
) -> Result<SpirvModule, ShaderCompileError> {
    let mut optimizer = spirv_tools::opt::create(Some(env));
    if passes == PassSet::Full {
        optimizer.register_size_passes();
        optimizer.register_hlsl_legalization_passes();
    }
    optimizer.register_performance_passes();

    let mut errors = Vec::new();
    let binary = optimizer
        .optimize(
            module.as_words(),
            &mut |msg: Message| match msg.level {
                MessageLevel::Fatal | MessageLevel::InternalError | MessageLevel::Error => {
                    errors.push(msg.message)
                }
                _ => log::trace!("spirv-opt: {}", msg.message),
            },
            None,
        )
        .map_err(|e| ShaderCompileError::OptimizerError(e.to_string()))?;

    if !errors.is_empty() {
        return Err(ShaderCompileError::OptimizerError(errors.join("\n")));
    }

    let optimized = SpirvModule::new(binary.as_words().to_vec());
    log::debug!(
        "optimized module from {} to {} words",
        module.as_words().len(),
        optimized.as_words().len()
    );
    Ok(optimized)
}

#[cfg(test)]
mod test {
    use crate::error::ShaderCompileError;
    use crate::optimize::{optimize, target_env};
    use crate::spirv::SpirvModule;

    #[test]
    pub fn maps_vulkan_versions() {
        for version in 10..=15 {
            assert!(target_env(version).is_ok());
        }
        assert!(matches!(
            target_env(16),
            Err(ShaderCompileError::UnsupportedVersion { version: 16, .. })
        ));
        assert!(target_env(0).is_err());
    }

    #[test]
    pub fn invalid_module_is_an_error() {
        let module = SpirvModule::new(vec![0x0723_0203, 0, 0]);
        assert!(matches!(
            optimize(&module, 13),
            Err(ShaderCompileError::OptimizerError(_))
        ));
    }
}
