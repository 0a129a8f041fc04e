/// Options controlling how a shader is compiled.
///
/// The meaning of `version` depends on the target:
///
/// | target            | `version`                                         |
/// |-------------------|---------------------------------------------------|
/// | OpenGL / ES       | GLSL version, e.g. `330`, `460`, or `300` for ES. |
/// | HLSL / DXIL       | Shader model times ten, e.g. `50`, `61`.          |
/// | Metal             | `major * 10 + minor`, e.g. `21`.                  |
/// | Vulkan            | SPIR-V environment `10` to `15`.                  |
/// | WGSL              | Ignored.                                          |
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Options {
    pub version: u32,
    /// Target OpenGL ES for GLSL, or iOS for Metal.
    pub mobile: bool,
    /// Keep debug info and skip all optimization.
    pub debug: bool,
    /// The name the single entry point of the output is given.
    pub entry_point: String,
    pub uniform_buffer_settings: UniformBufferSettings,
    pub push_constant_settings: PushConstantSettings,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            version: 0,
            mobile: false,
            debug: false,
            entry_point: String::from("main"),
            uniform_buffer_settings: UniformBufferSettings::default(),
            push_constant_settings: PushConstantSettings::default(),
        }
    }
}

impl Options {
    /// Default options with the given target version.
    pub fn with_version(version: u32) -> Self {
        Options {
            version,
            ..Default::default()
        }
    }
}

/// Renaming of the first uniform buffer in Metal output.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct UniformBufferSettings {
    pub rename_buffer: bool,
    pub new_buffer_name: String,
}

/// Placement of push constant buffers in Metal output.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct PushConstantSettings {
    /// The Metal buffer index given to the first push constant buffer.
    pub first_index: u8,
}
