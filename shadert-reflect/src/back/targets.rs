/// Marker trait for shader compiler targets.
pub trait OutputTarget {
    /// The output format for the target.
    type Output;
}

/// Shader compiler target for GLSL and GLSL ES.
pub struct GLSL;
/// Shader compiler target for HLSL.
pub struct HLSL;
/// Shader compiler target for SPIR-V.
pub struct SPIRV;
/// Shader compiler target for MSL.
pub struct MSL;
/// Shader compiler target for WGSL.
pub struct WGSL;
/// Shader compiler target for compiled Direct3D shader blobs.
pub struct DXIL;
/// Shader compiler target for native Metal libraries.
pub struct MetalLib;

impl OutputTarget for GLSL {
    type Output = String;
}
impl OutputTarget for HLSL {
    type Output = String;
}
impl OutputTarget for MSL {
    type Output = String;
}
impl OutputTarget for WGSL {
    type Output = String;
}
impl OutputTarget for SPIRV {
    type Output = Vec<u32>;
}
impl OutputTarget for DXIL {
    type Output = Vec<u8>;
}
impl OutputTarget for MetalLib {
    type Output = Vec<u8>;
}
