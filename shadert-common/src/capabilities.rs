/// DXIL output through an external HLSL toolchain.
pub const DXIL: bool = cfg!(feature = "dxil");

/// The legacy FXC toolchain used for shader model 5.0 and below. It ships only with Windows.
pub const DXIL_LEGACY: bool = cfg!(all(feature = "dxil", windows));

/// Native Metal library output through the Xcode toolchain.
pub const METAL_BINARY: bool = cfg!(all(feature = "metal-binary", target_vendor = "apple"));
