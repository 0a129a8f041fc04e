//! GLSL to SPIR-V compilation, reflection and cross compilation.
//!
//! A shader passes through the crate in three steps. The [front end](front) compiles
//! GLSL into a [`SpirvCompilation`](front::SpirvCompilation). A [backend](back) is
//! chosen for the requested target, which renames the entry point, reflects the
//! module and emits the target artifact. SPIR-V destined for Vulkan is run through the
//! [optimizer](optimize) in release builds.

/// Shader codegen backends.
pub mod back;
/// Error types.
pub mod error;
/// Shader frontend parsers.
pub mod front;
/// SPIR-V optimization.
pub mod optimize;
/// Shader reflection.
pub mod reflect;
/// Owned SPIR-V modules.
pub mod spirv;
