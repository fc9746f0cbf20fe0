use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Len,
}

impl Builtin {
    /// Required argument count, `None` for variadic builtins
    pub fn arity(self) -> Option<usize> {
        match self {
            Builtin::Print => None,
            Builtin::Len => Some(1),
        }
    }
}

/// What a name denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Var,
    Func { params: usize },
    Const,
    Builtin(Builtin),
    /// An import; the index points into the declaring file's import table
    Package(usize),
}

/// One block of declarations.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    entities: FxHashMap<String, Entity>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// The predeclared names.
    pub fn universe() -> Self {
        let mut scope = Self::new();
        for (name, entity) in [
            ("print", Entity::Builtin(Builtin::Print)),
            ("len", Entity::Builtin(Builtin::Len)),
            ("true", Entity::Const),
            ("false", Entity::Const),
            ("nil", Entity::Const),
        ] {
            scope.entities.insert(name.to_string(), entity);
        }
        scope
    }

    /// Declare `name` in this scope. Fails with the diagnostic message when
    /// the name is already taken here; outer scopes may be shadowed.
    pub fn declare(&mut self, name: &str, entity: Entity) -> Result<(), String> {
        if self.entities.contains_key(name) {
            return Err(format!("{} redeclared in this block", name));
        }
        self.entities.insert(name.to_string(), entity);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<Entity> {
        self.entities.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
