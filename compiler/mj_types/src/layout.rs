//! Per-class layout records.
//!
//! A [`ClassLayout`] is built once by the symbol-table pass and read-only
//! afterwards. Fields and methods keep their declaration order in `Vec`s,
//! with hash indices on the side for name lookup; a derived class starts
//! from a verbatim copy of its parent's entries, so offsets and slots agree
//! across the hierarchy by construction.

use mj_ir::TypeTag;
use rustc_hash::FxHashMap;

/// Size in bytes of a reference, and of the dispatch-table header every
/// object starts with.
pub const POINTER_SIZE: u32 = 8;

/// Storage size in bytes of a value of this type.
pub fn byte_size(ty: &TypeTag) -> u32 {
    match ty {
        TypeTag::Int => 4,
        TypeTag::Boolean => 1,
        TypeTag::IntArray | TypeTag::Class(_) => POINTER_SIZE,
    }
}

/// One declared or inherited instance field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: TypeTag,
    /// Byte offset from the object base. Never 0: that word holds the
    /// dispatch-table pointer.
    pub offset: u32,
}

/// One callable method as the dispatch table sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: String,
    /// The most specific class that defines or overrides the method; its
    /// function is what the dispatch-table entry points at.
    pub declaring_class: String,
    pub return_ty: TypeTag,
    /// Dispatch-table slot. An override keeps its parent's slot.
    pub slot: u32,
    /// Parameter types and names, in order. The receiver is implicit.
    pub params: Vec<(TypeTag, String)>,
}

/// Layout of one class: ordered fields with offsets, ordered methods with
/// dispatch slots, and the total instance size.
#[derive(Debug)]
pub struct ClassLayout {
    name: String,
    fields: Vec<Field>,
    field_index: FxHashMap<String, usize>,
    methods: Vec<MethodSignature>,
    method_index: FxHashMap<String, usize>,
    size: u32,
}

impl ClassLayout {
    pub(crate) fn new(name: String) -> Self {
        ClassLayout {
            name,
            fields: Vec::new(),
            field_index: FxHashMap::default(),
            methods: Vec::new(),
            method_index: FxHashMap::default(),
            size: POINTER_SIZE,
        }
    }

    /// Copy the parent's fields and methods verbatim. Offsets and slots are
    /// preserved; the derived class appends after them.
    pub(crate) fn inherit(&mut self, parent: &ClassLayout) {
        self.fields = parent.fields.clone();
        self.field_index = parent.field_index.clone();
        self.methods = parent.methods.clone();
        self.method_index = parent.method_index.clone();
        self.size = parent.size;
    }

    /// Record a field at the given offset. A redeclared name replaces its
    /// entry in place.
    pub(crate) fn push_field(&mut self, field: Field) {
        if let Some(&idx) = self.field_index.get(&field.name) {
            self.fields[idx] = field;
        } else {
            self.field_index.insert(field.name.clone(), self.fields.len());
            self.fields.push(field);
        }
    }

    /// Record a method. An existing name (an override, or a redeclaration)
    /// is replaced in place, keeping its position and therefore its slot
    /// order; a new name is appended.
    pub(crate) fn define_method(&mut self, sig: MethodSignature) {
        if let Some(&idx) = self.method_index.get(&sig.name) {
            self.methods[idx] = sig;
        } else {
            self.method_index.insert(sig.name.clone(), self.methods.len());
            self.methods.push(sig);
        }
    }

    pub(crate) fn set_size(&mut self, size: u32) {
        self.size = size;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.field_index.get(name).map(|&idx| &self.fields[idx])
    }

    pub fn method(&self, name: &str) -> Option<&MethodSignature> {
        self.method_index.get(name).map(|&idx| &self.methods[idx])
    }

    /// Fields in layout order, inherited first.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Methods in slot order, inherited slots first.
    pub fn methods(&self) -> &[MethodSignature] {
        &self.methods
    }

    /// Total instance size in bytes, header word included.
    pub fn size(&self) -> u32 {
        self.size
    }
}

/// All class layouts of a unit, in declaration order (entry class first).
#[derive(Debug, Default)]
pub struct ClassTable {
    classes: Vec<ClassLayout>,
    index: FxHashMap<String, usize>,
}

impl ClassTable {
    pub(crate) fn insert(&mut self, layout: ClassLayout) {
        if let Some(&idx) = self.index.get(layout.name()) {
            self.classes[idx] = layout;
        } else {
            self.index.insert(layout.name().to_owned(), self.classes.len());
            self.classes.push(layout);
        }
    }

    pub fn get(&self, name: &str) -> Option<&ClassLayout> {
        self.index.get(name).map(|&idx| &self.classes[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassLayout> {
        self.classes.iter()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn sizes_follow_the_representation_table() {
        assert_eq!(byte_size(&TypeTag::Int), 4);
        assert_eq!(byte_size(&TypeTag::Boolean), 1);
        assert_eq!(byte_size(&TypeTag::IntArray), 8);
        assert_eq!(byte_size(&TypeTag::Class("Point".to_owned())), 8);
    }

    #[test]
    fn inherit_copies_entries_verbatim() {
        let mut parent = ClassLayout::new("A".to_owned());
        parent.push_field(Field {
            name: "x".to_owned(),
            ty: TypeTag::Int,
            offset: POINTER_SIZE,
        });
        parent.define_method(MethodSignature {
            name: "f".to_owned(),
            declaring_class: "A".to_owned(),
            return_ty: TypeTag::Int,
            slot: 0,
            params: vec![],
        });
        parent.set_size(12);

        let mut child = ClassLayout::new("B".to_owned());
        child.inherit(&parent);
        assert_eq!(child.field("x"), parent.field("x"));
        assert_eq!(child.method("f"), parent.method("f"));
        assert_eq!(child.size(), 12);

        // An override replaces in place and keeps the slot.
        child.define_method(MethodSignature {
            name: "f".to_owned(),
            declaring_class: "B".to_owned(),
            return_ty: TypeTag::Int,
            slot: 0,
            params: vec![],
        });
        assert_eq!(child.methods().len(), 1);
        assert_eq!(child.method("f").unwrap().declaring_class, "B");
        assert_eq!(child.method("f").unwrap().slot, 0);
    }

    #[test]
    fn table_keeps_declaration_order() {
        let mut table = ClassTable::default();
        table.insert(ClassLayout::new("Main".to_owned()));
        table.insert(ClassLayout::new("B".to_owned()));
        table.insert(ClassLayout::new("A".to_owned()));
        let names: Vec<&str> = table.iter().map(ClassLayout::name).collect();
        assert_eq!(names, vec!["Main", "B", "A"]);
        assert_eq!(table.len(), 3);
        assert!(table.get("B").is_some());
        assert!(table.get("C").is_none());
    }
}
