use crate::codegen::class::ClassFile;
use crate::codegen::constpool::{Constant, ConstantPool};
use crate::codegen::defs::attribute_names;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConstantPoolVerifyError {
    #[error("Invalid constant pool index {0}")]
    InvalidConstantPoolIndex(u16),
    #[error("Invalid constant pool index type {0}")]
    InvalidConstantPoolIndexType(u16),
    #[error("Wide constant at {0} is not followed by an unusable slot")]
    MissingShadowSlot(u16),
    #[error("Unusable slot {0} does not follow a long or double")]
    StrayShadowSlot(u16),
    #[error("BootstrapMethods attribute not defined")]
    BootstrapMethodsNotDefined,
}

pub type Result<T> = std::result::Result<T, ConstantPoolVerifyError>;

/// Verify the ClassFile ConstantPool
pub fn verify(class_file: &ClassFile) -> Result<()> {
    verify_shadow_slots(&class_file.constant_pool)?;
    verify_constant_indexes(class_file)?;
    Ok(())
}

fn verify_shadow_slots(pool: &ConstantPool) -> Result<()> {
    let mut expect_shadow = None;
    for (index, constant) in pool.iter() {
        match (expect_shadow.take(), constant) {
            (Some(_), Constant::Unusable) => {}
            (Some(wide), _) => return Err(ConstantPoolVerifyError::MissingShadowSlot(wide)),
            (None, Constant::Unusable) => return Err(ConstantPoolVerifyError::StrayShadowSlot(index)),
            (None, constant) if constant.width() == 2 => expect_shadow = Some(index),
            (None, _) => {}
        }
    }
    match expect_shadow {
        Some(wide) => Err(ConstantPoolVerifyError::MissingShadowSlot(wide)),
        None => Ok(()),
    }
}

/// Checks that `target`, referenced from the entry at `index`, satisfies `is_expected`
fn expect_entry(pool: &ConstantPool, index: u16, target: u16, is_expected: fn(&Constant) -> bool) -> Result<()> {
    match pool.get(target) {
        Ok(constant) if is_expected(constant) => Ok(()),
        Ok(_) => Err(ConstantPoolVerifyError::InvalidConstantPoolIndexType(index)),
        Err(_) => Err(ConstantPoolVerifyError::InvalidConstantPoolIndex(index)),
    }
}

fn is_utf8(constant: &Constant) -> bool {
    matches!(constant, Constant::Utf8(_))
}

fn is_class(constant: &Constant) -> bool {
    matches!(constant, Constant::Class(_))
}

fn is_name_and_type(constant: &Constant) -> bool {
    matches!(constant, Constant::NameAndType(..))
}

fn is_member_ref(constant: &Constant) -> bool {
    matches!(constant, Constant::FieldRef(..) | Constant::MethodRef(..) | Constant::InterfaceMethodRef(..))
}

fn verify_constant_indexes(class_file: &ClassFile) -> Result<()> {
    let pool = &class_file.constant_pool;
    let has_bootstrap = class_file
        .attributes
        .iter()
        .any(|a| matches!(a.name(pool), Ok(attribute_names::BOOTSTRAP_METHODS)));

    for (index, constant) in pool.iter() {
        match constant {
            Constant::Class(name_index)
            | Constant::Module(name_index)
            | Constant::Package(name_index)
            | Constant::String(name_index)
            | Constant::MethodType(name_index) => expect_entry(pool, index, *name_index, is_utf8)?,
            Constant::FieldRef(class_index, nat_index)
            | Constant::MethodRef(class_index, nat_index)
            | Constant::InterfaceMethodRef(class_index, nat_index) => {
                expect_entry(pool, index, *class_index, is_class)?;
                expect_entry(pool, index, *nat_index, is_name_and_type)?;
            }
            Constant::NameAndType(name_index, desc_index) => {
                expect_entry(pool, index, *name_index, is_utf8)?;
                expect_entry(pool, index, *desc_index, is_utf8)?;
            }
            Constant::MethodHandle(_kind, reference_index) => {
                expect_entry(pool, index, *reference_index, is_member_ref)?;
            }
            Constant::Dynamic(_bsm_index, nat_index) | Constant::InvokeDynamic(_bsm_index, nat_index) => {
                if !has_bootstrap {
                    return Err(ConstantPoolVerifyError::BootstrapMethodsNotDefined);
                }
                expect_entry(pool, index, *nat_index, is_name_and_type)?;
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_with(constants: Vec<Constant>) -> ClassFile {
        let mut class_file = ClassFile::new();
        class_file.constant_pool = ConstantPool::from_constants(constants);
        class_file
    }

    #[test]
    fn well_formed_pool_passes() {
        let mut class_file = ClassFile::new();
        let pool = &mut class_file.constant_pool;
        pool.add_method_ref("java/lang/Error", "<init>", "()V").unwrap();
        pool.add_long(7).unwrap();
        pool.add_string("hello").unwrap();
        assert_eq!(verify(&class_file), Ok(()));
    }

    #[test]
    fn class_must_point_at_utf8() {
        let class_file = class_with(vec![Constant::Integer(3), Constant::Class(1)]);
        assert_eq!(verify(&class_file), Err(ConstantPoolVerifyError::InvalidConstantPoolIndexType(2)));
    }

    #[test]
    fn dangling_reference() {
        let class_file = class_with(vec![Constant::String(9)]);
        assert_eq!(verify(&class_file), Err(ConstantPoolVerifyError::InvalidConstantPoolIndex(1)));
    }

    #[test]
    fn long_needs_its_shadow_slot() {
        let class_file = class_with(vec![Constant::Long(1), Constant::Integer(2)]);
        assert_eq!(verify(&class_file), Err(ConstantPoolVerifyError::MissingShadowSlot(1)));
        let class_file = class_with(vec![Constant::Unusable]);
        assert_eq!(verify(&class_file), Err(ConstantPoolVerifyError::StrayShadowSlot(1)));
    }

    #[test]
    fn invokedynamic_requires_bootstrap_methods() {
        let class_file = class_with(vec![
            Constant::Utf8("run".into()),
            Constant::Utf8("()V".into()),
            Constant::NameAndType(1, 2),
            Constant::InvokeDynamic(0, 3),
        ]);
        assert_eq!(verify(&class_file), Err(ConstantPoolVerifyError::BootstrapMethodsNotDefined));
    }
}
