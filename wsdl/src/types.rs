#[derive(Default, Debug, Clone)]
pub struct Namespaces(Vec<String>);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespacedName {
    namespace_idx: usize,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    pub min: u32,
    pub max: MaxOccurs,
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    /// `type="..."` reference to a named type.
    Type(NamespacedName),
    /// Anonymous type declared inline.
    Inner(TypeKind),
    /// `ref="..."` reference to a top-level element.
    Ref(NamespacedName),
    /// No type information at all (`xsd:anyType`).
    Untyped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Derivation {
    Extension(NamespacedName),
    Restriction(NamespacedName),
}

#[derive(Debug, Clone, Default)]
pub struct ComplexType {
    pub base: Option<Derivation>,
    pub fields: Vec<Field>,
    pub attributes: Vec<String>,
    pub simple_content: Option<NamespacedName>,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Complex(ComplexType),
    /// Restriction base, when the simple type declares one.
    Simple(Option<NamespacedName>),
}

#[derive(Debug, Clone)]
pub struct Type {
    pub name: NamespacedName,
    pub kind: TypeKind,
}

#[derive(Debug, Clone)]
pub struct Element {
    pub name: NamespacedName,
    pub ty: FieldKind,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: NamespacedName,
    pub ty: FieldKind,
    pub occurs: Occurs,
}

#[derive(Debug, Clone)]
pub struct Part {
    pub name: String,
    pub element: Option<NamespacedName>,
    pub ty: Option<NamespacedName>,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub name: NamespacedName,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone)]
pub struct Operation {
    pub name: NamespacedName,
    pub documentation: Option<String>,
    pub input: Option<NamespacedName>,
    pub output: Option<NamespacedName>,
}

#[derive(Debug, Clone)]
pub struct PortType {
    pub name: NamespacedName,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone)]
pub struct BindingOperation {
    pub name: NamespacedName,
    pub action: Option<String>,
    pub style: Option<String>,
    pub input: Option<String>,
    pub output: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub name: NamespacedName,
    pub ty: NamespacedName,
    pub transport: Option<String>,
    pub operations: Vec<BindingOperation>,
}

#[derive(Debug, Clone)]
pub struct Port {
    pub name: NamespacedName,
    pub binding: NamespacedName,
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Service {
    pub name: NamespacedName,
    pub ports: Vec<Port>,
}

#[derive(Default, Debug, Clone)]
pub struct Definition {
    pub namespaces: Namespaces,

    pub elements: Vec<Element>,
    pub types: Vec<Type>,
    pub messages: Vec<Message>,
    pub port_types: Vec<PortType>,
    pub bindings: Vec<Binding>,
    pub services: Vec<Service>,
}

impl Namespaces {
    pub fn namespaces(&self) -> &[String] {
        &self.0
    }

    pub fn add_or_get(&mut self, namespace: &str) -> usize {
        if let Some(index) = self.index_of(namespace) {
            index
        } else {
            let index = self.0.len();
            self.0.push(namespace.to_owned());
            index
        }
    }

    fn index_of(&self, namespace: &str) -> Option<usize> {
        self.0.iter().position(|value| value == namespace)
    }
}

impl NamespacedName {
    pub fn new(namespaces: &mut Namespaces, namespace: &str, name: String) -> Self {
        Self {
            namespace_idx: namespaces.add_or_get(namespace),
            name,
        }
    }

    pub fn index(&self) -> usize {
        self.namespace_idx
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self {
            min: 1,
            max: MaxOccurs::Bounded(1),
        }
    }
}

impl Occurs {
    pub fn parse(min: Option<&str>, max: Option<&str>) -> Self {
        let default = Self::default();

        let min = min
            .and_then(|min| min.trim().parse().ok())
            .unwrap_or(default.min);

        let max = match max.map(str::trim) {
            Some("unbounded") => MaxOccurs::Unbounded,
            Some(max) => max
                .parse()
                .map(MaxOccurs::Bounded)
                .unwrap_or(default.max),
            None => default.max,
        };

        Self { min, max }
    }

    /// True when the element may repeat.
    pub fn is_many(&self) -> bool {
        match self.max {
            MaxOccurs::Unbounded => true,
            MaxOccurs::Bounded(max) => max > 1,
        }
    }
}
