use crate::jvm::{Deserialize, Error};
use byteorder::ReadBytesExt;
use std::io::Read;

/// A single parsed constant pool entry
///
/// Index fields refer back into the same pool. `Long` and `Double` occupy two
/// pool slots; the slot after them is left vacant.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.4
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    String(u16),
    FieldRef { class: u16, name_and_type: u16 },
    MethodRef { class: u16, name_and_type: u16 },
    InterfaceMethodRef { class: u16, name_and_type: u16 },
    NameAndType { name: u16, descriptor: u16 },
    MethodHandle { kind: u8, reference: u16 },
    MethodType(u16),
    Dynamic { bootstrap_method: u16, name_and_type: u16 },
    InvokeDynamic { bootstrap_method: u16, name_and_type: u16 },
    Module(u16),
    Package(u16),
}

/// Read-side constant pool
///
/// Entry 0 is always vacant; so is the entry following every `Long`/`Double`.
#[derive(Debug)]
pub struct ConstantPool {
    entries: Vec<Option<Constant>>,
}

impl ConstantPool {
    /// Parse the pool, including its `u16` entry-count prefix
    pub fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<ConstantPool, Error> {
        let count = u16::deserialize(reader)?;
        let mut entries: Vec<Option<Constant>> = Vec::with_capacity(count as usize);
        entries.push(None);
        while entries.len() < count as usize {
            let tag = u8::deserialize(reader)?;
            let constant = match tag {
                1 => {
                    let len = u16::deserialize(reader)?;
                    let mut bytes = vec![0u8; len as usize];
                    reader.read_exact(&mut bytes)?;
                    Constant::Utf8(decode_modified_utf8(&bytes)?)
                }
                3 => Constant::Integer(i32::deserialize(reader)?),
                4 => Constant::Float(f32::deserialize(reader)?),
                5 => Constant::Long(i64::deserialize(reader)?),
                6 => Constant::Double(f64::deserialize(reader)?),
                7 => Constant::Class(u16::deserialize(reader)?),
                8 => Constant::String(u16::deserialize(reader)?),
                9 => Constant::FieldRef {
                    class: u16::deserialize(reader)?,
                    name_and_type: u16::deserialize(reader)?,
                },
                10 => Constant::MethodRef {
                    class: u16::deserialize(reader)?,
                    name_and_type: u16::deserialize(reader)?,
                },
                11 => Constant::InterfaceMethodRef {
                    class: u16::deserialize(reader)?,
                    name_and_type: u16::deserialize(reader)?,
                },
                12 => Constant::NameAndType {
                    name: u16::deserialize(reader)?,
                    descriptor: u16::deserialize(reader)?,
                },
                15 => Constant::MethodHandle {
                    kind: u8::deserialize(reader)?,
                    reference: u16::deserialize(reader)?,
                },
                16 => Constant::MethodType(u16::deserialize(reader)?),
                17 => Constant::Dynamic {
                    bootstrap_method: u16::deserialize(reader)?,
                    name_and_type: u16::deserialize(reader)?,
                },
                18 => Constant::InvokeDynamic {
                    bootstrap_method: u16::deserialize(reader)?,
                    name_and_type: u16::deserialize(reader)?,
                },
                19 => Constant::Module(u16::deserialize(reader)?),
                20 => Constant::Package(u16::deserialize(reader)?),
                other => {
                    return Err(Error::BadClassFile(format!(
                        "Unknown constant pool tag {} at entry {}",
                        other,
                        entries.len()
                    )))
                }
            };
            let two_slots = matches!(constant, Constant::Long(_) | Constant::Double(_));
            entries.push(Some(constant));
            if two_slots {
                entries.push(None);
            }
        }
        Ok(ConstantPool { entries })
    }

    pub fn get(&self, index: u16) -> Result<&Constant, Error> {
        self.entries
            .get(index as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::BadClassFile(format!("Invalid constant pool index {}", index)))
    }

    pub fn utf8(&self, index: u16) -> Result<&str, Error> {
        match self.get(index)? {
            Constant::Utf8(string) => Ok(string),
            other => Err(Error::BadClassFile(format!(
                "Expected Utf8 at constant pool index {}, found {:?}",
                index, other
            ))),
        }
    }

    /// Internal name referred to by a `Class` entry
    pub fn class_name(&self, index: u16) -> Result<&str, Error> {
        match self.get(index)? {
            Constant::Class(name) => self.utf8(*name),
            other => Err(Error::BadClassFile(format!(
                "Expected Class at constant pool index {}, found {:?}",
                index, other
            ))),
        }
    }

    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str), Error> {
        match self.get(index)? {
            Constant::NameAndType { name, descriptor } => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            other => Err(Error::BadClassFile(format!(
                "Expected NameAndType at constant pool index {}, found {:?}",
                index, other
            ))),
        }
    }

    /// Resolve a field/method/interface-method reference into
    /// `(owner, name, descriptor, is_interface)`
    pub fn member_ref(&self, index: u16) -> Result<(&str, &str, &str, bool), Error> {
        let (class, name_and_type, interface) = match self.get(index)? {
            Constant::FieldRef {
                class,
                name_and_type,
            }
            | Constant::MethodRef {
                class,
                name_and_type,
            } => (*class, *name_and_type, false),
            Constant::InterfaceMethodRef {
                class,
                name_and_type,
            } => (*class, *name_and_type, true),
            other => {
                return Err(Error::BadClassFile(format!(
                    "Expected member reference at constant pool index {}, found {:?}",
                    index, other
                )))
            }
        };
        let owner = self.class_name(class)?;
        let (name, descriptor) = self.name_and_type(name_and_type)?;
        Ok((owner, name, descriptor, interface))
    }
}

/// Decode the JVM's modified UTF-8 into a string
///
/// Differences from standard UTF-8: `\0` is encoded as `0xC0 0x80`, and
/// supplementary characters appear as a 3+3 byte surrogate pair. Decoding to
/// UTF-16 code units first handles both.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.4.7
pub fn decode_modified_utf8(bytes: &[u8]) -> Result<String, Error> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    let malformed =
        |at: usize| Error::BadClassFile(format!("Malformed modified UTF-8 at byte {}", at));
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            units.push(b as u16);
            i += 1;
        } else if b & 0xE0 == 0xC0 {
            let b2 = *bytes.get(i + 1).ok_or_else(|| malformed(i))?;
            units.push(((b as u16 & 0x1F) << 6) | (b2 as u16 & 0x3F));
            i += 2;
        } else if b & 0xF0 == 0xE0 {
            let b2 = *bytes.get(i + 1).ok_or_else(|| malformed(i))?;
            let b3 = *bytes.get(i + 2).ok_or_else(|| malformed(i))?;
            units.push(((b as u16 & 0x0F) << 12) | ((b2 as u16 & 0x3F) << 6) | (b3 as u16 & 0x3F));
            i += 3;
        } else {
            return Err(malformed(i));
        }
    }
    String::from_utf16(&units)
        .map_err(|_| Error::BadClassFile(String::from("Unpaired surrogate in modified UTF-8")))
}
