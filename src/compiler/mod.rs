// Lua bytecode compiler - Main module
//
// Single-pass, recursive-descent compiler: the parser drives code
// generation directly as it recognizes each construct, with no
// intermediate syntax tree. `parser` holds the lexer, `func_state`
// the per-function compile-time state (locals, upvalues, block/goto
// bookkeeping), `code` the lcode.c-style instruction emitter, and
// `statement`/`expr_parser` the grammar itself.
pub mod code;
pub mod expr_parser;
pub mod expression;
pub mod func_state;
pub mod parse_literal;
pub mod parser;
pub mod statement;

pub use expression::{ExpDesc, ExpKind, ExpUnion};
pub use func_state::{BlockCntId, FuncState, LhsAssignId, VarKind};

use crate::gc::ObjectPool;
use crate::lua_value::Chunk;
use crate::lua_vm::LuaVM;
use parser::{LuaLanguageLevel, LuaParser};

/// Intern a string into the function's chunk constant pool, returning its
/// index. Port of `luaK_stringK` from lcode.c: dedups against existing
/// string constants so the same literal is never stored twice.
pub fn string_k(fs: &mut FuncState, s: String) -> usize {
    let id = fs.pool.create_string_owned(s);
    let value = crate::lua_value::LuaValue::string(id);
    for (i, k) in fs.chunk.constants.iter().enumerate() {
        if k.raw_equal(&value, fs.pool) {
            return i;
        }
    }
    fs.chunk.constants.push(value);
    fs.chunk.constants.len() - 1
}

/// Compile Lua source code to bytecode, using the VM's object pool for
/// string interning.
pub fn compile_code(source: &str, vm: &mut LuaVM) -> Result<Chunk, String> {
    compile_code_with_name(source, vm, "chunk")
}

pub fn compile_code_with_name(
    source: &str,
    vm: &mut LuaVM,
    chunk_name: &str,
) -> Result<Chunk, String> {
    let pool = vm.object_pool_mut();
    compile(source, pool, chunk_name)
}

/// Compile a standalone chunk against an explicit object pool (used by
/// tests and by nested `compile_code`/`compile_code_with_name` callers).
pub fn compile(source: &'_ str, pool: &mut ObjectPool, chunk_name: &str) -> Result<Chunk, String> {
    // SAFETY: the lexer and pool outlive the FuncState built from them for
    // the whole duration of this call; no reference escapes `compile`.
    let mut lexer = LuaParser::new(source, LuaLanguageLevel::Lua54);
    let lexer_ref: &mut LuaParser = &mut lexer;
    let lexer_ref: &mut LuaParser<'static> = unsafe { std::mem::transmute(lexer_ref) };
    let pool_ref: &mut ObjectPool = unsafe { &mut *(pool as *mut ObjectPool) };

    let mut fs = FuncState::new(lexer_ref, pool_ref, true);
    fs.source_name = chunk_name.to_string();
    fs.chunk.source_name = Some(chunk_name.to_string());
    fs.chunk.is_vararg = true;

    statement::mainfunc(&mut fs)?;

    let mut chunk = fs.chunk;
    chunk.upvalue_count = 1;
    chunk.upvalue_descs.push(crate::lua_value::UpvalueDesc {
        is_local: true,
        index: 0,
    });
    Ok(chunk)
}
