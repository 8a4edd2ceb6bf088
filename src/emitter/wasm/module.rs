//! In-memory WASM module builder, mirroring the reference `WabbitWasmModule`
//! / `WasmFunction` / `WasmGlobalVariable` classes (§4.7).
use super::encode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValType {
    I32,
    F64,
}

impl ValType {
    pub fn byte(self) -> u8 {
        match self {
            ValType::I32 => 0x7f,
            ValType::F64 => 0x7c,
        }
    }
}

pub struct ImportedFunction {
    pub envname: &'static str,
    pub name: &'static str,
    pub argtypes: Vec<ValType>,
    pub rettypes: Vec<ValType>,
    pub idx: u32,
}

pub struct Function {
    pub name: String,
    pub argtypes: Vec<ValType>,
    pub rettypes: Vec<ValType>,
    pub idx: u32,
    pub code: Vec<u8>,
    pub local_types: Vec<ValType>,
}

impl Function {
    fn push(&mut self, bytes: &[u8]) {
        self.code.extend_from_slice(bytes);
    }

    pub fn iconst(&mut self, value: i32) {
        self.push(&[0x41]);
        self.code.extend(encode::signed(value as i64));
    }

    pub fn fconst(&mut self, value: f64) {
        self.push(&[0x44]);
        self.code.extend(encode::f64_bytes(value));
    }

    pub fn iadd(&mut self) { self.push(&[0x6a]); }
    pub fn isub(&mut self) { self.push(&[0x6b]); }
    pub fn imul(&mut self) { self.push(&[0x6c]); }
    pub fn idiv(&mut self) { self.push(&[0x6d]); }
    pub fn ieqz(&mut self) { self.push(&[0x45]); }
    pub fn ieq(&mut self) { self.push(&[0x46]); }
    pub fn ineq(&mut self) { self.push(&[0x47]); }
    pub fn ilt(&mut self) { self.push(&[0x48]); }
    pub fn igt(&mut self) { self.push(&[0x4a]); }
    pub fn ile(&mut self) { self.push(&[0x4c]); }
    pub fn ige(&mut self) { self.push(&[0x4e]); }
    pub fn iand(&mut self) { self.push(&[0x71]); }
    pub fn ior(&mut self) { self.push(&[0x72]); }
    pub fn fadd(&mut self) { self.push(&[0xa0]); }
    pub fn fsub(&mut self) { self.push(&[0xa1]); }
    pub fn fmul(&mut self) { self.push(&[0xa2]); }
    pub fn fdiv(&mut self) { self.push(&[0xa3]); }
    pub fn feq(&mut self) { self.push(&[0x61]); }
    pub fn fneq(&mut self) { self.push(&[0x62]); }
    pub fn flt(&mut self) { self.push(&[0x63]); }
    pub fn fgt(&mut self) { self.push(&[0x64]); }
    pub fn fle(&mut self) { self.push(&[0x65]); }
    pub fn fge(&mut self) { self.push(&[0x66]); }
    pub fn ret(&mut self) { self.push(&[0x0f]); }

    pub fn call(&mut self, idx: u32) {
        self.push(&[0x10]);
        self.code.extend(encode::unsigned(idx as u64));
    }

    /// Allocates a new local, returning its index (arguments occupy the
    /// first `argtypes.len()` indices).
    pub fn alloca(&mut self, ty: ValType) -> u32 {
        let idx = (self.argtypes.len() + self.local_types.len()) as u32;
        self.local_types.push(ty);
        idx
    }

    pub fn local_get(&mut self, idx: u32) {
        self.push(&[0x20]);
        self.code.extend(encode::unsigned(idx as u64));
    }

    pub fn local_set(&mut self, idx: u32) {
        self.push(&[0x21]);
        self.code.extend(encode::unsigned(idx as u64));
    }

    pub fn global_get(&mut self, idx: u32) {
        self.push(&[0x23]);
        self.code.extend(encode::unsigned(idx as u64));
    }

    pub fn global_set(&mut self, idx: u32) {
        self.push(&[0x24]);
        self.code.extend(encode::unsigned(idx as u64));
    }

    pub fn block(&mut self) { self.push(&[0x02, 0x40]); }
    pub fn loop_(&mut self) { self.push(&[0x03, 0x40]); }

    pub fn if_start(&mut self, result: Option<ValType>) {
        self.push(&[0x04]);
        match result {
            None => self.push(&[0x40]),
            Some(t) => self.push(&[t.byte()]),
        }
    }

    pub fn else_(&mut self) { self.push(&[0x05]); }
    pub fn end(&mut self) { self.push(&[0x0b]); }
    pub fn drop_(&mut self) { self.push(&[0x1a]); }

    pub fn br(&mut self, depth: u32) {
        self.push(&[0x0c]);
        self.code.extend(encode::unsigned(depth as u64));
    }

    pub fn br_if(&mut self, depth: u32) {
        self.push(&[0x0d]);
        self.code.extend(encode::unsigned(depth as u64));
    }
}

pub struct GlobalVariable {
    pub name: String,
    pub ty: ValType,
    pub initializer: GlobalInit,
    pub idx: u32,
}

#[derive(Debug, Clone, Copy)]
pub enum GlobalInit {
    I32(i32),
    F64(f64),
}

#[derive(Default)]
pub struct Module {
    pub imported_functions: Vec<ImportedFunction>,
    pub functions: Vec<Function>,
    pub global_variables: Vec<GlobalVariable>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn import_function(
        &mut self,
        envname: &'static str,
        name: &'static str,
        argtypes: Vec<ValType>,
        rettypes: Vec<ValType>,
    ) -> u32 {
        let idx = self.imported_functions.len() as u32;
        self.imported_functions.push(ImportedFunction {
            envname,
            name,
            argtypes,
            rettypes,
            idx,
        });
        idx
    }

    pub fn add_function(
        &mut self,
        name: impl Into<String>,
        argtypes: Vec<ValType>,
        rettypes: Vec<ValType>,
    ) -> u32 {
        let idx = (self.imported_functions.len() + self.functions.len()) as u32;
        self.functions.push(Function {
            name: name.into(),
            argtypes,
            rettypes,
            idx,
            code: vec![],
            local_types: vec![],
        });
        idx
    }

    pub fn add_global(&mut self, name: impl Into<String>, ty: ValType, initializer: GlobalInit) -> u32 {
        let idx = self.global_variables.len() as u32;
        self.global_variables.push(GlobalVariable {
            name: name.into(),
            ty,
            initializer,
            idx,
        });
        idx
    }

    pub fn encode(&self) -> Vec<u8> {
        let all_funcs: Vec<(&[ValType], &[ValType])> = self
            .imported_functions
            .iter()
            .map(|f| (f.argtypes.as_slice(), f.rettypes.as_slice()))
            .chain(self.functions.iter().map(|f| (f.argtypes.as_slice(), f.rettypes.as_slice())))
            .collect();

        let signatures: Vec<Vec<u8>> = all_funcs
            .iter()
            .map(|(args, rets)| encode_signature(args, rets))
            .collect();
        let section1 = encode::section(1, encode::vector(&signatures));

        let imports: Vec<Vec<u8>> = self
            .imported_functions
            .iter()
            .map(encode_import)
            .collect();
        let section2 = encode::section(2, encode::vector(&imports));

        let func_type_indices: Vec<Vec<u8>> = self
            .functions
            .iter()
            .map(|f| encode::unsigned(f.idx as u64))
            .collect();
        let section3 = encode::section(3, encode::vector(&func_type_indices));

        let globals: Vec<Vec<u8>> = self.global_variables.iter().map(encode_global).collect();
        let section6 = encode::section(6, encode::vector(&globals));

        let exports: Vec<Vec<u8>> = self.functions.iter().map(encode_export).collect();
        let section7 = encode::section(7, encode::vector(&exports));

        let codes: Vec<Vec<u8>> = self.functions.iter().map(encode_function_code).collect();
        let section10 = encode::section(10, encode::vector(&codes));

        let mut out = vec![0x00, b'a', b's', b'm', 0x01, 0x00, 0x00, 0x00];
        out.extend(section1);
        out.extend(section2);
        out.extend(section3);
        out.extend(section6);
        out.extend(section7);
        out.extend(section10);
        out
    }
}

fn encode_signature(args: &[ValType], rets: &[ValType]) -> Vec<u8> {
    let mut out = vec![0x60];
    out.extend(encode::vector(&args.iter().map(|t| vec![t.byte()]).collect::<Vec<_>>()));
    out.extend(encode::vector(&rets.iter().map(|t| vec![t.byte()]).collect::<Vec<_>>()));
    out
}

fn encode_import(func: &ImportedFunction) -> Vec<u8> {
    let mut out = encode::string(func.envname);
    out.extend(encode::string(func.name));
    out.push(0x00);
    out.extend(encode::unsigned(func.idx as u64));
    out
}

fn encode_export(func: &Function) -> Vec<u8> {
    let mut out = encode::string(&func.name);
    out.push(0x00);
    out.extend(encode::unsigned(func.idx as u64));
    out
}

fn encode_function_code(func: &Function) -> Vec<u8> {
    let local_decls: Vec<Vec<u8>> = func
        .local_types
        .iter()
        .map(|t| {
            let mut d = vec![0x01];
            d.push(t.byte());
            d
        })
        .collect();
    let mut code = encode::vector(&local_decls);
    code.extend(&func.code);
    if func.code.last() != Some(&0x0b) {
        code.push(0x0b);
    }
    encode::byte_vector(&code)
}

fn encode_global(gvar: &GlobalVariable) -> Vec<u8> {
    let mut out = vec![gvar.ty.byte(), 0x01];
    match gvar.initializer {
        GlobalInit::I32(v) => {
            out.push(0x41);
            out.extend(encode::signed(v as i64));
        }
        GlobalInit::F64(v) => {
            out.push(0x44);
            out.extend(encode::f64_bytes(v));
        }
    }
    out.push(0x0b);
    out
}
