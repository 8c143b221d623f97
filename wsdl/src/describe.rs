use std::collections::HashSet;

use super::{
    error::Error,
    types::{
        BindingOperation, ComplexType, Definition, Derivation, Element, FieldKind, MaxOccurs,
        Message, NamespacedName, Operation, Type, TypeKind,
    },
};

/// Deepest element nesting `describe_operation` will expand.
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDescription {
    pub name: String,
    pub type_name: Option<String>,
    pub min_occurs: u32,
    pub max_occurs: MaxOccurs,
    pub elements: Vec<ElementDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescription {
    pub name: String,
    pub action: Option<String>,
    pub input: Vec<ElementDescription>,
    pub output: Vec<ElementDescription>,
}

impl ElementDescription {
    pub fn is_many(&self) -> bool {
        match self.max_occurs {
            MaxOccurs::Unbounded => true,
            MaxOccurs::Bounded(max) => max > 1,
        }
    }
}

fn lookup<'a, T>(
    items: &'a [T],
    name: &NamespacedName,
    key: impl Fn(&T) -> &NamespacedName,
) -> Option<&'a T> {
    items
        .iter()
        .find(|item| key(*item) == name)
        .or_else(|| items.iter().find(|item| key(*item).name == name.name))
}

impl Definition {
    /// Every operation exposed by the document's services, in document order.
    pub fn operation_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();

        let mut push = |name: &str| {
            if seen.insert(name.to_owned()) {
                names.push(name.to_owned());
            }
        };

        if self.services.is_empty() {
            for operation in self.port_types.iter().flat_map(|port| &port.operations) {
                push(&operation.name.name);
            }
        } else {
            for port in self.services.iter().flat_map(|service| &service.ports) {
                if let Some(binding) = lookup(&self.bindings, &port.binding, |b| &b.name) {
                    for operation in &binding.operations {
                        push(&operation.name.name);
                    }
                }
            }
        }

        names
    }

    pub fn binding_operation(&self, name: &str) -> Option<&BindingOperation> {
        self.bindings
            .iter()
            .flat_map(|binding| &binding.operations)
            .find(|operation| operation.name.name == name)
    }

    fn port_operation(&self, name: &str) -> Option<&Operation> {
        let bound = self.bindings.iter().find_map(|binding| {
            binding
                .operations
                .iter()
                .any(|operation| operation.name.name == name)
                .then(|| lookup(&self.port_types, &binding.ty, |port| &port.name))
                .flatten()
        });

        let mut candidates = bound
            .into_iter()
            .chain(self.port_types.iter())
            .flat_map(|port| &port.operations);

        candidates.find(|operation| operation.name.name == name)
    }

    fn find_element(&self, name: &NamespacedName) -> Option<&Element> {
        lookup(&self.elements, name, |element| &element.name)
    }

    fn find_type(&self, name: &NamespacedName) -> Option<&Type> {
        lookup(&self.types, name, |ty| &ty.name)
    }

    fn find_message(&self, name: &NamespacedName) -> Option<&Message> {
        lookup(&self.messages, name, |message| &message.name)
    }

    /// Describes the body elements an operation sends and receives.
    ///
    /// Returns `Ok(None)` when no binding declares the operation.
    pub fn describe_operation(&self, name: &str) -> Result<Option<OperationDescription>, Error> {
        let binding = match self.binding_operation(name) {
            Some(binding) => binding,
            None => return Ok(None),
        };

        let operation = self.port_operation(name);

        Ok(Some(OperationDescription {
            name: binding.name.name.clone(),
            action: binding.action.clone(),
            input: self.message_elements(operation.and_then(|op| op.input.as_ref()))?,
            output: self.message_elements(operation.and_then(|op| op.output.as_ref()))?,
        }))
    }

    fn message_elements(
        &self,
        message: Option<&NamespacedName>,
    ) -> Result<Vec<ElementDescription>, Error> {
        let message = match message.and_then(|name| self.find_message(name)) {
            Some(message) => message,
            None => return Ok(Vec::new()),
        };

        let mut elements = Vec::new();

        for part in &message.parts {
            if let Some(element) = part.element.as_ref().and_then(|name| self.find_element(name)) {
                elements.extend(self.kind_elements(&element.ty, 0)?);
            } else if let Some(ty) = &part.ty {
                elements.extend(self.kind_elements(&FieldKind::Type(ty.clone()), 0)?);
            }
        }

        Ok(elements)
    }

    fn kind_elements(&self, kind: &FieldKind, depth: usize) -> Result<Vec<ElementDescription>, Error> {
        if depth > MAX_DEPTH {
            return Err(Error::DepthExceeded(MAX_DEPTH));
        }

        match kind {
            FieldKind::Type(name) => match self.find_type(name) {
                Some(Type {
                    kind: TypeKind::Complex(content),
                    ..
                }) => self.complex_elements(content, depth),

                _ => Ok(Vec::new()),
            },

            FieldKind::Inner(TypeKind::Complex(content)) => self.complex_elements(content, depth),

            FieldKind::Ref(name) => match self.find_element(name) {
                Some(element) => self.kind_elements(&element.ty, depth + 1),
                None => Ok(Vec::new()),
            },

            FieldKind::Inner(TypeKind::Simple(_)) | FieldKind::Untyped => Ok(Vec::new()),
        }
    }

    fn complex_elements(
        &self,
        content: &ComplexType,
        depth: usize,
    ) -> Result<Vec<ElementDescription>, Error> {
        if depth > MAX_DEPTH {
            return Err(Error::DepthExceeded(MAX_DEPTH));
        }

        let mut elements = Vec::new();

        if let Some(Derivation::Extension(base)) = &content.base {
            if let Some(Type {
                kind: TypeKind::Complex(base),
                ..
            }) = self.find_type(base)
            {
                elements.extend(self.complex_elements(base, depth + 1)?);
            }
        }

        for field in &content.fields {
            let (name, kind) = match &field.ty {
                FieldKind::Ref(reference) => match self.find_element(reference) {
                    Some(element) => (&element.name.name, &element.ty),
                    None => (&field.name.name, &field.ty),
                },

                kind => (&field.name.name, kind),
            };

            let type_name = match kind {
                FieldKind::Type(ty) => Some(ty.name.clone()),
                _ => None,
            };

            elements.push(ElementDescription {
                name: name.clone(),
                type_name,
                min_occurs: field.occurs.min,
                max_occurs: field.occurs.max,
                elements: self.kind_elements(kind, depth + 1)?,
            });
        }

        Ok(elements)
    }
}
