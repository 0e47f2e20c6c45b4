// Type and location definitions shared by the scanner and the declaration models

use std::fmt;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Base of a C type, before pointers and array dimensions are applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseType {
    /// Builtin keyword sequence, normalized to single spaces (`unsigned long int`)
    Builtin(String),
    Struct(String),
    Union(String),
    Enum(String),
    /// A typedef name such as `uint8_t`
    Named(String),
    FunctionPointer {
        return_type: Box<Type>,
        params: Vec<Type>,
        is_variadic: bool,
    },
}

/// Type representation with qualifiers, pointers, and arrays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    pub base: BaseType,
    pub is_const: bool,
    pub is_volatile: bool,
    pub pointer_depth: usize, // 0 = not pointer, 1 = *, 2 = **, etc.
    pub array_dims: Vec<Option<String>>, // None for unsized dimension, else the size expression
}

impl Type {
    pub fn new(base: BaseType) -> Self {
        Type {
            base,
            is_const: false,
            is_volatile: false,
            pointer_depth: 0,
            array_dims: Vec::new(),
        }
    }

    pub fn builtin(name: &str) -> Self {
        Type::new(BaseType::Builtin(name.to_string()))
    }

    pub fn named(name: &str) -> Self {
        Type::new(BaseType::Named(name.to_string()))
    }

    pub fn with_const(mut self) -> Self {
        self.is_const = true;
        self
    }

    pub fn with_pointer(mut self) -> Self {
        self.pointer_depth += 1;
        self
    }

    pub fn with_array(mut self, size: Option<&str>) -> Self {
        self.array_dims.push(size.map(str::to_string));
        self
    }

    /// `void` with no pointer or array parts
    pub fn is_void(&self) -> bool {
        self.pointer_depth == 0
            && self.array_dims.is_empty()
            && matches!(&self.base, BaseType::Builtin(name) if name == "void")
    }

    pub fn is_pointer(&self) -> bool {
        self.pointer_depth > 0 || !self.array_dims.is_empty()
    }

    pub fn is_function_pointer(&self) -> bool {
        matches!(self.base, BaseType::FunctionPointer { .. })
    }

    /// Spelling of the base with qualifiers, without pointers or arrays
    pub fn base_spelling(&self) -> String {
        let mut out = String::new();
        if self.is_const {
            out.push_str("const ");
        }
        if self.is_volatile {
            out.push_str("volatile ");
        }
        match &self.base {
            BaseType::Builtin(name) | BaseType::Named(name) => out.push_str(name),
            BaseType::Struct(name) => {
                out.push_str("struct ");
                out.push_str(name);
            }
            BaseType::Union(name) => {
                out.push_str("union ");
                out.push_str(name);
            }
            BaseType::Enum(name) => {
                out.push_str("enum ");
                out.push_str(name);
            }
            BaseType::FunctionPointer { return_type, .. } => out.push_str(&return_type.to_string()),
        }
        out
    }

    /// C declaration of `name` with this type, e.g. `int *buf[]` or `void (*cb)(int)`
    pub fn declare(&self, name: &str) -> String {
        let dims: String = self
            .array_dims
            .iter()
            .map(|d| format!("[{}]", d.as_deref().unwrap_or("")))
            .collect();
        let stars = "*".repeat(self.pointer_depth);

        if let BaseType::FunctionPointer {
            params,
            is_variadic,
            ..
        } = &self.base
        {
            return format!(
                "{} ({}{}{})({})",
                self.base_spelling(),
                "*".repeat(self.pointer_depth.max(1)),
                name,
                dims,
                param_list(params, *is_variadic)
            );
        }
        format!("{} {}{}{}", self.base_spelling(), stars, name, dims)
    }
}

fn param_list(params: &[Type], is_variadic: bool) -> String {
    let mut list: Vec<String> = params.iter().map(Type::to_string).collect();
    if is_variadic {
        list.push("...".to_string());
    }
    if list.is_empty() {
        list.push("void".to_string());
    }
    list.join(", ")
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: String = self
            .array_dims
            .iter()
            .map(|d| format!("[{}]", d.as_deref().unwrap_or("")))
            .collect();

        if let BaseType::FunctionPointer {
            params,
            is_variadic,
            ..
        } = &self.base
        {
            let stars = "*".repeat(self.pointer_depth.max(1));
            return write!(
                f,
                "{} ({}{})({})",
                self.base_spelling(),
                stars,
                dims,
                param_list(params, *is_variadic)
            );
        }

        write!(f, "{}", self.base_spelling())?;
        if self.pointer_depth > 0 {
            write!(f, " {}", "*".repeat(self.pointer_depth))?;
        }
        if !dims.is_empty() {
            if self.pointer_depth == 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", dims)?;
        }
        Ok(())
    }
}

/// Function parameter. Prototypes may leave parameters unnamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: Option<String>,
    pub param_type: Type,
}

/// Struct field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub field_type: Type,
    /// Width of a bit-field member, as written
    pub bit_width: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_spelling() {
        assert_eq!(Type::builtin("int").to_string(), "int");
        assert_eq!(
            Type::named("uint8_t").with_const().with_pointer().to_string(),
            "const uint8_t *"
        );
        assert_eq!(
            Type::builtin("int").with_pointer().with_array(None).to_string(),
            "int *[]"
        );
        assert_eq!(
            Type::builtin("char").with_array(Some("16")).to_string(),
            "char [16]"
        );
        assert_eq!(
            Type::new(BaseType::Struct("point".into())).to_string(),
            "struct point"
        );
    }

    #[test]
    fn test_function_pointer_spelling() {
        let fp = Type::new(BaseType::FunctionPointer {
            return_type: Box::new(Type::builtin("int")),
            params: vec![Type::builtin("int"), Type::builtin("char").with_pointer()],
            is_variadic: false,
        })
        .with_pointer();
        assert_eq!(fp.to_string(), "int (*)(int, char *)");
        assert!(fp.is_function_pointer());
    }

    #[test]
    fn test_declare() {
        assert_eq!(
            Type::builtin("int").with_pointer().with_array(None).declare("buf"),
            "int *buf[]"
        );
        assert_eq!(Type::builtin("int").declare("x"), "int x");
        let cb = Type::new(BaseType::FunctionPointer {
            return_type: Box::new(Type::builtin("void")),
            params: vec![Type::builtin("int")],
            is_variadic: false,
        })
        .with_pointer();
        assert_eq!(cb.declare("cb"), "void (*cb)(int)");
    }

    #[test]
    fn test_is_void() {
        assert!(Type::builtin("void").is_void());
        assert!(!Type::builtin("void").with_pointer().is_void());
        assert!(!Type::builtin("int").is_void());
    }
}
