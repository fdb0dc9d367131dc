use super::function::unqualified;
use super::{
    DiagnosticKind, Diagnostics, Error, FunctionContext, FunctionTranslator, Settings,
    TranslationContext,
};
use crate::ast::{
    ClassDeclaration, CompilationUnit, FieldDeclaration, FunctionDeclaration, FunctionKind,
    Member, Modifiers,
};
use crate::feb::{
    self, Attribute, BinaryName, ChannelId, ChannelSet, CodeBuilder, ConstantPool,
    ConstantsWriter, EntityFile, EntityFlags, EntityType, FieldEntity, FieldFlags, FieldType,
    FunctionDescriptor, FunctionEntity, FunctionFlags, Name, RenderDescriptor, UnqualifiedName,
};
use crate::symbols::{ScopeId, ScopeKind, Symbol, SymbolTable};
use std::collections::HashMap;
use std::path::PathBuf;

/// What functions of the class being generated need to know about it
#[derive(Debug)]
pub struct ClassLayout {
    pub name: BinaryName,

    /// Superclass whose initializer `<initialize>` chains to
    pub superclass: BinaryName,

    /// Class scope, in which field initializers are resolved
    pub scope: ScopeId,

    /// Slot of each function in the function table, keyed on name and parameter count
    function_table: HashMap<(String, usize), u16>,
}

impl ClassLayout {
    pub fn table_index(&self, name: &str, arity: usize) -> Option<u16> {
        self.function_table.get(&(name.to_owned(), arity)).copied()
    }

    fn assign_table_index(&mut self, name: &str, arity: usize) -> u16 {
        let next = self.function_table.len() as u16;
        *self
            .function_table
            .entry((name.to_owned(), arity))
            .or_insert(next)
    }
}

/// Entity produced for one class, before it is written out
#[derive(Debug)]
pub struct TranslatedEntity {
    pub name: BinaryName,
    pub entity: EntityFile,

    /// Errors reported while translating this class
    pub error_count: usize,
}

/// Outcome of [`EntityGenerator::generate`]
#[derive(Debug, Default)]
pub struct GenerationSummary {
    /// Entity files written
    pub written: Vec<PathBuf>,

    /// Classes not written because errors were reported for them
    pub suppressed: Vec<BinaryName>,

    /// Errors reported over the whole unit
    pub error_count: usize,
}

/// Translates compilation units into entities, one class at a time
///
/// The constant pool and channel set are reused across classes: the pool is reset at the start
/// of every class, and every channel opened for a class is closed by the time it is assembled.
pub struct EntityGenerator<'s> {
    settings: Settings,
    symbols: &'s SymbolTable,
    constants: ConstantPool,
    channels: ChannelSet,
    diagnostics: Diagnostics,
}

impl<'s> EntityGenerator<'s> {
    pub fn new(settings: Settings, symbols: &'s SymbolTable) -> EntityGenerator<'s> {
        EntityGenerator {
            settings,
            symbols,
            constants: ConstantPool::new(),
            channels: ChannelSet::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Everything reported so far
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Translate and write out every class of a unit
    ///
    /// Classes with errors are skipped when `suppress_output_on_error` is set.
    pub fn generate(&mut self, unit: &CompilationUnit) -> Result<GenerationSummary, Error> {
        let mut summary = GenerationSummary::default();

        for translated in self.translate_unit(unit)? {
            summary.error_count += translated.error_count;
            if translated.error_count > 0 && self.settings.suppress_output_on_error {
                log::warn!(
                    "Not writing '{}' ({} error(s) reported)",
                    translated.name,
                    translated.error_count
                );
                summary.suppressed.push(translated.name);
                continue;
            }

            let path = self.settings.output_directory.join(format!(
                "{}.{}",
                translated.name,
                EntityFile::EXTENSION
            ));
            log::info!("Writing '{}'", path.display());
            translated
                .entity
                .save_to_path(&path, self.settings.create_missing_directories)
                .map_err(feb::Error::IoError)?;
            summary.written.push(path);
        }

        Ok(summary)
    }

    /// Translate every class of a unit into an entity
    pub fn translate_unit(
        &mut self,
        unit: &CompilationUnit,
    ) -> Result<Vec<TranslatedEntity>, Error> {
        unit.classes
            .iter()
            .map(|class| self.translate_class(class))
            .collect()
    }

    /// Translate one class, leaving no channel open even if translation fails
    fn translate_class(&mut self, class: &ClassDeclaration) -> Result<TranslatedEntity, Error> {
        let translated = self.assemble_class(class);
        if let Err(err) = &translated {
            log::debug!("Abandoning class '{}': {:?}", class.name.as_str(), err);
            self.channels.clear();
        }
        translated
    }

    fn assemble_class(&mut self, class: &ClassDeclaration) -> Result<TranslatedEntity, Error> {
        let errors_before = self.diagnostics.error_count();
        self.constants.reset();

        let name = match self.symbols.kind(class.scope) {
            ScopeKind::Class { qualified_name } => qualified_name.clone(),
            other => panic!("class '{}' has a {:?} scope", class.name.as_str(), other),
        };
        log::debug!("Translating class '{}'", name);

        let superclass_names = self.resolve_superclasses(class);
        let this_entity = name.constant_index(&mut self.constants)?;
        let superclasses = superclass_names
            .iter()
            .map(|superclass| superclass.constant_index(&mut self.constants))
            .collect::<Result<Vec<_>, _>>()?;

        let fields: Vec<&FieldDeclaration> = class
            .members
            .iter()
            .filter_map(|member| match member {
                Member::Field(field) => Some(field),
                Member::Function(_) => None,
            })
            .collect();
        let functions: Vec<&FunctionDeclaration> = class
            .members
            .iter()
            .filter_map(|member| match member {
                Member::Function(function) => Some(function),
                Member::Field(_) => None,
            })
            .collect();

        let needs_default_initializer = functions
            .iter()
            .all(|function| function.kind != FunctionKind::Initializer);
        let needs_static_initializer = fields.iter().any(|field| {
            field.modifiers.contains(Modifiers::STATIC)
                && field
                    .declarators
                    .iter()
                    .any(|declarator| declarator.initializer.is_some())
        });

        let mut layout = ClassLayout {
            name: name.clone(),
            superclass: superclass_names[0].clone(),
            scope: class.scope,
            function_table: HashMap::new(),
        };
        for function in &functions {
            let name = function_name(function)?;
            layout.assign_table_index(name.as_str(), function.parameters.len());
        }
        if needs_default_initializer {
            layout.assign_table_index(UnqualifiedName::INITIALIZE.as_str(), 0);
        }
        if needs_static_initializer {
            layout.assign_table_index(UnqualifiedName::STATIC_INITIALIZER.as_str(), 0);
        }

        // Static initializer code goes to the primary channel, which stays open for the class
        let primary = self.channels.add_channel();
        self.channels.set_active(primary);

        let field_entities = self.field_entities(&fields)?;

        let mut function_entities = vec![];
        for function in &functions {
            let entity = self.function_entity(&layout, function, &fields)?;
            function_entities.push(entity);
        }
        if needs_default_initializer {
            let entity = self.default_initializer(&layout, &fields)?;
            function_entities.push(entity);
        }
        if needs_static_initializer {
            let entity = self.static_initializer(&layout, &fields, primary)?;
            function_entities.push(entity);
        } else {
            let _ = self.channels.remove_channel(primary);
        }
        assert_eq!(
            self.channels.open_channels(),
            0,
            "channels left open after translating '{}'",
            name
        );

        let entity = EntityFile {
            version: self.settings.version,
            stream_flags: 0,
            constants: self.constants.entries().to_vec(),
            entity_type: EntityType::Class,
            entity_flags: EntityFlags::from_bits_truncate(class.modifiers.bits()),
            this_entity,
            superclasses,
            attributes: vec![],
            fields: field_entities,
            functions: function_entities,
        };

        let error_count = self.diagnostics.error_count() - errors_before;
        log::debug!(
            "Translated class '{}': {} constants, {} error(s)",
            name,
            self.constants.len(),
            error_count
        );
        Ok(TranslatedEntity {
            name,
            entity,
            error_count,
        })
    }

    /// Superclasses are resolved in the scope enclosing the class
    fn resolve_superclasses(&mut self, class: &ClassDeclaration) -> Vec<BinaryName> {
        let outer = self.symbols.parent(class.scope).unwrap_or(class.scope);
        let mut superclasses = vec![];
        for superclass in &class.superclasses {
            match self.symbols.resolve(outer, superclass.as_str()) {
                Some(Symbol::Class(resolved)) => {
                    superclasses.push(resolved.qualified_name.clone())
                }
                _ => self.diagnostics.report(
                    DiagnosticKind::UnresolvedSymbol,
                    superclass.span,
                    format!("cannot resolve superclass '{}'", superclass.as_str()),
                ),
            }
        }
        if superclasses.is_empty() {
            superclasses.push(self.settings.default_superclass.clone());
        }
        superclasses
    }

    fn field_entities(&mut self, fields: &[&FieldDeclaration]) -> Result<Vec<FieldEntity>, Error> {
        let descriptor_index = self.constants.get_utf8(FieldType::OBJECT.render())?;
        let mut entities = vec![];
        for declaration in fields {
            let mut flags = FieldFlags::from_bits_truncate(declaration.modifiers.bits());
            if declaration.constant {
                flags |= FieldFlags::FINAL;
            }
            for declarator in &declaration.declarators {
                let name = unqualified(&declarator.name)?;
                entities.push(FieldEntity {
                    flags,
                    name_index: self.constants.get_utf8(name.as_str())?,
                    descriptor_index,
                    table_index: entities.len() as u16,
                    attributes: vec![],
                });
            }
        }
        Ok(entities)
    }

    fn function_entity(
        &mut self,
        layout: &ClassLayout,
        function: &FunctionDeclaration,
        fields: &[&FieldDeclaration],
    ) -> Result<FunctionEntity, Error> {
        let (is_static, locals_base) = match self.symbols.kind(function.scope) {
            ScopeKind::Function {
                is_static,
                local_variable_count,
            } => (*is_static, *local_variable_count),
            other => panic!(
                "function '{}' has a {:?} scope",
                function.name.as_str(),
                other
            ),
        };
        let is_initializer = function.kind == FunctionKind::Initializer;
        let arity = function.parameters.len();
        let name = function_name(function)?;
        let descriptor = if is_initializer {
            FunctionDescriptor::initializer(arity)
        } else {
            FunctionDescriptor::dynamic(arity)
        };
        log::trace!("Translating function '{}{}'", name, descriptor.render());

        let attributes = match &function.body {
            None => vec![],
            Some(body) => {
                let context = FunctionContext {
                    scope: function.scope,
                    is_static,
                    is_initializer,
                    locals_base,
                };
                let code = self.translate_body(layout, context, None, |translator| {
                    if is_initializer {
                        translator.initialize_instance(fields)?;
                    }
                    translator.translate_block(body)
                })?;
                vec![code]
            }
        };

        Ok(FunctionEntity {
            flags: FunctionFlags::from_bits_truncate(function.modifiers.bits()),
            name_index: self.constants.get_utf8(name.as_str())?,
            descriptor_index: self.constants.get_utf8(descriptor.render())?,
            table_index: layout.table_index(name.as_str(), arity).unwrap_or(0),
            attributes,
        })
    }

    /// `<initialize>` for classes which don't declare one
    fn default_initializer(
        &mut self,
        layout: &ClassLayout,
        fields: &[&FieldDeclaration],
    ) -> Result<FunctionEntity, Error> {
        let context = FunctionContext {
            scope: layout.scope,
            is_static: false,
            is_initializer: true,
            locals_base: 1,
        };
        let code = self.translate_body(layout, context, None, |translator| {
            translator.initialize_instance(fields)
        })?;

        let name = UnqualifiedName::INITIALIZE;
        Ok(FunctionEntity {
            flags: FunctionFlags::PUBLIC,
            name_index: self.constants.get_utf8(name.as_str())?,
            descriptor_index: self
                .constants
                .get_utf8(FunctionDescriptor::initializer(0).render())?,
            table_index: layout.table_index(name.as_str(), 0).unwrap_or(0),
            attributes: vec![code],
        })
    }

    /// `<staticInitializer>`, built on the class's primary channel
    fn static_initializer(
        &mut self,
        layout: &ClassLayout,
        fields: &[&FieldDeclaration],
        primary: ChannelId,
    ) -> Result<FunctionEntity, Error> {
        let context = FunctionContext {
            scope: layout.scope,
            is_static: true,
            is_initializer: true,
            locals_base: 0,
        };
        let code = self.translate_body(layout, context, Some(primary), |translator| {
            translator.initialize_fields(fields, true)
        })?;

        let name = UnqualifiedName::STATIC_INITIALIZER;
        Ok(FunctionEntity {
            flags: FunctionFlags::STATIC,
            name_index: self.constants.get_utf8(name.as_str())?,
            descriptor_index: self
                .constants
                .get_utf8(FunctionDescriptor::initializer(0).render())?,
            table_index: layout.table_index(name.as_str(), 0).unwrap_or(0),
            attributes: vec![code],
        })
    }

    /// Run `translate` on a fresh function body and turn the result into an attribute
    ///
    /// The body goes to a new channel unless `channel` names an existing one.
    fn translate_body<F>(
        &mut self,
        layout: &ClassLayout,
        function: FunctionContext,
        channel: Option<ChannelId>,
        translate: F,
    ) -> Result<Attribute, Error>
    where
        F: FnOnce(&mut FunctionTranslator<'_>) -> Result<(), Error>,
    {
        let code = match channel {
            Some(channel) => CodeBuilder::on_channel(&mut self.channels, channel),
            None => CodeBuilder::new(&mut self.channels),
        };
        let context = TranslationContext {
            constants: &mut self.constants,
            diagnostics: &mut self.diagnostics,
            symbols: self.symbols,
            class: layout,
        };

        let mut translator = FunctionTranslator::new(code, context, function);
        translate(&mut translator)?;
        let instructions = translator.finish()?;
        Ok(self.constants.get_attribute(instructions)?)
    }
}

/// Name under which a declared function is emitted
fn function_name(function: &FunctionDeclaration) -> Result<UnqualifiedName, Error> {
    match function.kind {
        FunctionKind::Initializer => Ok(UnqualifiedName::INITIALIZE),
        FunctionKind::Function => unqualified(&function.name),
    }
}
