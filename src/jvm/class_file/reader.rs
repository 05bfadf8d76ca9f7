use super::{decode_modified_utf8, ConstantPool};
use crate::jvm::{ClassAccessFlags, Deserialize, Error, FieldAccessFlags, MethodAccessFlags};
use std::io::Read;

const CLASS_MAGIC: u32 = 0xCAFE_BABE;

/// What to leave out while parsing
///
/// Frames (`StackMapTable`) are never loaded: the inliner invalidates them
/// anyway and an external pass recomputes them after surgery. Debug tables
/// are only kept when source maps are being generated.
#[derive(Copy, Clone, Debug, Default)]
pub struct ParseOptions {
    /// Drop `SourceFile`, `SourceDebugExtension`, `LineNumberTable`, and
    /// `LocalVariableTable`
    pub skip_debug: bool,
}

/// Parsed class file, reduced to what method loading needs
#[derive(Debug)]
pub struct ClassFile {
    pub major_version: u16,
    pub minor_version: u16,
    pub access_flags: ClassAccessFlags,
    pub this_class: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub methods: Vec<RawMethod>,

    /// Class-level `SourceFile` attribute
    pub source_file: Option<String>,

    /// Class-level `SourceDebugExtension` attribute (the rich source map
    /// descriptor)
    pub source_debug_extension: Option<String>,

    /// The parsed constant pool, kept around so bytecode arrays can be
    /// disassembled later
    pub constant_pool: ConstantPool,
}

/// A method as it appears in the class file, body still in its binary form
#[derive(Debug)]
pub struct RawMethod {
    pub access_flags: MethodAccessFlags,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub exceptions: Vec<String>,
    pub code: Option<CodeAttribute>,
}

/// Decoded `Code` attribute, bytecode array still undisassembled
#[derive(Debug)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub bytecode: Vec<u8>,
    pub exception_table: Vec<RawExceptionHandler>,

    /// `(start_pc, line_number)` pairs, accumulated over all
    /// `LineNumberTable` attributes
    pub line_numbers: Vec<(u16, u16)>,
    pub local_variables: Vec<RawLocalVariable>,
}

#[derive(Debug)]
pub struct RawExceptionHandler {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,

    /// `None` is the catch-all entry used for `finally`
    pub catch_type: Option<String>,
}

#[derive(Debug)]
pub struct RawLocalVariable {
    pub start_pc: u16,
    pub length: u16,
    pub name: String,
    pub descriptor: String,
    pub index: u16,
}

impl ClassFile {
    pub fn parse(class_data: &[u8], options: ParseOptions) -> Result<ClassFile, Error> {
        let input = &mut &class_data[..];

        let magic = u32::deserialize(input)?;
        if magic != CLASS_MAGIC {
            return Err(Error::BadClassFile(format!(
                "Bad class file magic {:#010x}",
                magic
            )));
        }
        let minor_version = u16::deserialize(input)?;
        let major_version = u16::deserialize(input)?;

        let pool = ConstantPool::parse(input)?;

        let access_flags = ClassAccessFlags::deserialize(input)?;
        let this_class = pool.class_name(u16::deserialize(input)?)?.to_owned();
        let super_index = u16::deserialize(input)?;
        let super_class = if super_index == 0 {
            None
        } else {
            Some(pool.class_name(super_index)?.to_owned())
        };

        let interface_count = u16::deserialize(input)?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(pool.class_name(u16::deserialize(input)?)?.to_owned());
        }

        // Fields carry nothing the inliner consumes, but they must be walked over
        let field_count = u16::deserialize(input)?;
        for _ in 0..field_count {
            let _access = FieldAccessFlags::deserialize(input)?;
            let _name = u16::deserialize(input)?;
            let _descriptor = u16::deserialize(input)?;
            skip_attributes(input)?;
        }

        let method_count = u16::deserialize(input)?;
        let mut methods = Vec::with_capacity(method_count as usize);
        for _ in 0..method_count {
            methods.push(parse_method(input, &pool, options)?);
        }

        let mut source_file = None;
        let mut source_debug_extension = None;
        let attribute_count = u16::deserialize(input)?;
        for _ in 0..attribute_count {
            let name_index = u16::deserialize(input)?;
            let length = u32::deserialize(input)? as usize;
            match pool.utf8(name_index)? {
                "SourceFile" if !options.skip_debug => {
                    source_file = Some(pool.utf8(u16::deserialize(input)?)?.to_owned());
                }
                "SourceDebugExtension" if !options.skip_debug => {
                    let mut bytes = vec![0u8; length];
                    input.read_exact(&mut bytes).map_err(Error::IoError)?;
                    source_debug_extension = Some(decode_modified_utf8(&bytes)?);
                }
                _ => skip_bytes(input, length)?,
            }
        }

        Ok(ClassFile {
            major_version,
            minor_version,
            access_flags,
            this_class,
            super_class,
            interfaces,
            methods,
            source_file,
            source_debug_extension,
            constant_pool: pool,
        })
    }

    /// Locate the unique method matching both name and descriptor
    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&RawMethod> {
        self.methods
            .iter()
            .find(|method| method.name == name && method.descriptor == descriptor)
    }
}

fn parse_method(
    input: &mut &[u8],
    pool: &ConstantPool,
    options: ParseOptions,
) -> Result<RawMethod, Error> {
    let access_flags = MethodAccessFlags::deserialize(input)?;
    let name = pool.utf8(u16::deserialize(input)?)?.to_owned();
    let descriptor = pool.utf8(u16::deserialize(input)?)?.to_owned();

    let mut signature = None;
    let mut exceptions = vec![];
    let mut code = None;

    let attribute_count = u16::deserialize(input)?;
    for _ in 0..attribute_count {
        let name_index = u16::deserialize(input)?;
        let length = u32::deserialize(input)? as usize;
        match pool.utf8(name_index)? {
            "Code" => code = Some(parse_code(input, pool, options)?),
            "Signature" => signature = Some(pool.utf8(u16::deserialize(input)?)?.to_owned()),
            "Exceptions" => {
                let count = u16::deserialize(input)?;
                for _ in 0..count {
                    exceptions.push(pool.class_name(u16::deserialize(input)?)?.to_owned());
                }
            }
            _ => skip_bytes(input, length)?,
        }
    }

    Ok(RawMethod {
        access_flags,
        name,
        descriptor,
        signature,
        exceptions,
        code,
    })
}

fn parse_code(
    input: &mut &[u8],
    pool: &ConstantPool,
    options: ParseOptions,
) -> Result<CodeAttribute, Error> {
    let max_stack = u16::deserialize(input)?;
    let max_locals = u16::deserialize(input)?;
    let code_length = u32::deserialize(input)? as usize;
    let mut bytecode = vec![0u8; code_length];
    input.read_exact(&mut bytecode).map_err(Error::IoError)?;

    let handler_count = u16::deserialize(input)?;
    let mut exception_table = Vec::with_capacity(handler_count as usize);
    for _ in 0..handler_count {
        let start_pc = u16::deserialize(input)?;
        let end_pc = u16::deserialize(input)?;
        let handler_pc = u16::deserialize(input)?;
        let catch_index = u16::deserialize(input)?;
        let catch_type = if catch_index == 0 {
            None
        } else {
            Some(pool.class_name(catch_index)?.to_owned())
        };
        exception_table.push(RawExceptionHandler {
            start_pc,
            end_pc,
            handler_pc,
            catch_type,
        });
    }

    let mut line_numbers = vec![];
    let mut local_variables = vec![];
    let attribute_count = u16::deserialize(input)?;
    for _ in 0..attribute_count {
        let name_index = u16::deserialize(input)?;
        let length = u32::deserialize(input)? as usize;
        match pool.utf8(name_index)? {
            "LineNumberTable" if !options.skip_debug => {
                let count = u16::deserialize(input)?;
                for _ in 0..count {
                    let start_pc = u16::deserialize(input)?;
                    let line = u16::deserialize(input)?;
                    line_numbers.push((start_pc, line));
                }
            }
            "LocalVariableTable" if !options.skip_debug => {
                let count = u16::deserialize(input)?;
                for _ in 0..count {
                    let start_pc = u16::deserialize(input)?;
                    let length = u16::deserialize(input)?;
                    let name = pool.utf8(u16::deserialize(input)?)?.to_owned();
                    let descriptor = pool.utf8(u16::deserialize(input)?)?.to_owned();
                    let index = u16::deserialize(input)?;
                    local_variables.push(RawLocalVariable {
                        start_pc,
                        length,
                        name,
                        descriptor,
                        index,
                    });
                }
            }
            // StackMapTable lands here on purpose: frames are never loaded
            _ => skip_bytes(input, length)?,
        }
    }

    Ok(CodeAttribute {
        max_stack,
        max_locals,
        bytecode,
        exception_table,
        line_numbers,
        local_variables,
    })
}

fn skip_attributes(input: &mut &[u8]) -> Result<(), Error> {
    let count = u16::deserialize(input)?;
    for _ in 0..count {
        let _name = u16::deserialize(input)?;
        let length = u32::deserialize(input)? as usize;
        skip_bytes(input, length)?;
    }
    Ok(())
}

fn skip_bytes(input: &mut &[u8], n: usize) -> Result<(), Error> {
    if input.len() < n {
        return Err(Error::BadClassFile(format!(
            "Attribute length {} overruns end of class file",
            n
        )));
    }
    *input = &input[n..];
    Ok(())
}
