use crate::error::ShaderReflectError;

/// Reflection via spirv-cross.
pub mod cross;

/// Reflection of interface decorations via rspirv.
pub mod rspirv;

/// A trait for compilation outputs that can provide reflection information.
pub trait ReflectShader {
    /// Reflect the resources and interface of the shader.
    fn reflect(&mut self) -> Result<ReflectData, ShaderReflectError>;
}

/// A resource declared by a shader.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Resource {
    /// The result id of the variable.
    pub id: u32,
    pub type_id: u32,
    pub base_type_id: u32,
    pub name: String,
    /// The `Location` decoration. Only stage inputs and outputs carry one.
    pub location: Option<u32>,
}

/// Reflection information for a compiled shader.
///
/// Stage inputs and outputs are ordered by location. Other lists keep the order
/// the decompiler reported them in.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ReflectData {
    pub uniform_buffers: Vec<Resource>,
    pub storage_buffers: Vec<Resource>,
    pub stage_inputs: Vec<Resource>,
    pub stage_outputs: Vec<Resource>,
    pub subpass_inputs: Vec<Resource>,
    pub storage_images: Vec<Resource>,
    pub sampled_images: Vec<Resource>,
    pub atomic_counters: Vec<Resource>,
    pub acceleration_structures: Vec<Resource>,
    pub push_constant_buffers: Vec<Resource>,
    pub separate_images: Vec<Resource>,
    pub separate_samplers: Vec<Resource>,
    /// The local work group size of a compute shader, or zero for other stages.
    pub compute_dim: [u32; 3],
}

/// A uniform the front end found to be statically used.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Uniform {
    /// The uniform name. Block members are named `Block.member`.
    pub name: String,
    /// The number of array elements, or 1 for a non-array.
    pub array_size: u32,
    /// The byte offset inside the enclosing block, or -1 outside a block.
    pub buffer_offset: i32,
    /// The OpenGL type enumerant, such as `GL_FLOAT_VEC4`. Zero for types with no enumerant.
    pub declared_type: u32,
}

/// A stage input the front end found to be statically used.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LiveAttribute {
    pub name: String,
    pub location: Option<u32>,
}

/// Sort interface variables by location. Variables without a location sort last and
/// ties keep their relative order.
pub(crate) fn sort_by_location(resources: &mut [Resource]) {
    resources.sort_by_key(|r| (r.location.is_none(), r.location));
}

/// Check the reflected stage inputs against the attributes the front end found live.
///
/// Every live attribute with a location must appear among the stage inputs, and there
/// must be at least as many stage inputs as live attributes. Declared inputs that are
/// never read survive in debug builds, so the reflected count may exceed the live count.
pub fn verify_interface(
    reflection: &ReflectData,
    attributes: &[LiveAttribute],
) -> Result<(), ShaderReflectError> {
    if attributes.len() > reflection.stage_inputs.len() {
        return Err(ShaderReflectError::InterfaceCountMismatch {
            live: attributes.len(),
            reflected: reflection.stage_inputs.len(),
        });
    }

    for attribute in attributes {
        let Some(location) = attribute.location else {
            continue;
        };
        if !reflection
            .stage_inputs
            .iter()
            .any(|input| input.location == Some(location))
        {
            return Err(ShaderReflectError::InterfaceMismatch {
                name: attribute.name.clone(),
                location,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use crate::error::ShaderReflectError;
    use crate::reflect::{sort_by_location, verify_interface, LiveAttribute, ReflectData, Resource};

    fn input(id: u32, name: &str, location: Option<u32>) -> Resource {
        Resource {
            id,
            type_id: 0,
            base_type_id: 0,
            name: name.to_string(),
            location,
        }
    }

    #[test]
    pub fn sorts_by_location_stably() {
        let mut inputs = vec![
            input(1, "c", None),
            input(2, "a", Some(1)),
            input(3, "b", Some(0)),
            input(4, "d", Some(1)),
        ];
        sort_by_location(&mut inputs);
        let names: Vec<_> = inputs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["b", "a", "d", "c"]);
    }

    #[test]
    pub fn missing_attribute_is_a_mismatch() {
        let reflection = ReflectData {
            stage_inputs: vec![input(3, "b", Some(0))],
            ..Default::default()
        };

        let live = [LiveAttribute {
            name: "b".into(),
            location: Some(0),
        }];
        assert!(verify_interface(&reflection, &live).is_ok());

        let live = [LiveAttribute {
            name: "a".into(),
            location: Some(1),
        }];
        assert!(matches!(
            verify_interface(&reflection, &live),
            Err(ShaderReflectError::InterfaceMismatch { location: 1, .. })
        ));
    }

    #[test]
    pub fn fewer_inputs_than_live_attributes_is_a_mismatch() {
        let reflection = ReflectData {
            stage_inputs: vec![input(3, "b", Some(0))],
            ..Default::default()
        };
        let live = [
            LiveAttribute {
                name: "b".into(),
                location: Some(0),
            },
            LiveAttribute {
                name: "c".into(),
                location: None,
            },
        ];
        assert!(matches!(
            verify_interface(&reflection, &live),
            Err(ShaderReflectError::InterfaceCountMismatch {
                live: 2,
                reflected: 1
            })
        ));
    }
}
