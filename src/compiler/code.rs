// Code generation - Port from lcode.c
use crate::compiler::func_state::FuncState;
use crate::compiler::parser::BinaryOperator;
use crate::lua_value::LuaValue;
use crate::lua_vm::{Instruction, OpCode};

// Port of luaK_code from lcode.c
pub fn code_abc(fs: &mut FuncState, op: OpCode, a: u32, b: u32, c: u32) -> usize {
    let mut instr = (op as u32) << Instruction::POS_OP;
    Instruction::set_a(&mut instr, a);
    Instruction::set_b(&mut instr, b);
    Instruction::set_c(&mut instr, c);
    let pc = fs.pc;
    fs.chunk.code.push(instr);
    fs.pc += 1;
    pc
}

// Port of luaK_codeABx from lcode.c
pub fn code_abx(fs: &mut FuncState, op: OpCode, a: u32, bx: u32) -> usize {
    let mut instr = (op as u32) << Instruction::POS_OP;
    Instruction::set_a(&mut instr, a);
    Instruction::set_bx(&mut instr, bx);
    let pc = fs.pc;
    fs.chunk.code.push(instr);
    fs.pc += 1;
    pc
}

// Port of luaK_codeAsBx from lcode.c
pub fn code_asbx(fs: &mut FuncState, op: OpCode, a: u32, sbx: i32) -> usize {
    let mut instr = (op as u32) << Instruction::POS_OP;
    Instruction::set_a(&mut instr, a);
    let bx = (sbx + Instruction::OFFSET_SBX) as u32;
    Instruction::set_bx(&mut instr, bx);
    let pc = fs.pc;
    fs.chunk.code.push(instr);
    fs.pc += 1;
    pc
}

// Port of luaK_codeABCk from lcode.c
pub fn code_abck(fs: &mut FuncState, op: OpCode, a: u32, b: u32, c: u32, k: bool) -> usize {
    let mut instr = (op as u32) << Instruction::POS_OP;
    Instruction::set_a(&mut instr, a);
    Instruction::set_b(&mut instr, b);
    Instruction::set_c(&mut instr, c);
    Instruction::set_k(&mut instr, k);
    let pc = fs.pc;
    fs.chunk.code.push(instr);
    fs.pc += 1;
    pc
}

// Port of the Ax instruction format (used for ExtraArg)
fn code_ax(fs: &mut FuncState, op: OpCode, ax: u32) -> usize {
    let instr = Instruction::create_ax(op, ax);
    let pc = fs.pc;
    fs.chunk.code.push(instr);
    fs.pc += 1;
    pc
}

// Port of the sJ instruction format (used for Jmp)
fn code_sj(fs: &mut FuncState, op: OpCode, sj: i32) -> usize {
    let instr = Instruction::create_sj(op, sj);
    let pc = fs.pc;
    fs.chunk.code.push(instr);
    fs.pc += 1;
    pc
}

use crate::compiler::expression::{ExpDesc, ExpKind, ExpUnion};

/// Sentinel passed to setlist/setreturns meaning "as many results as there are".
pub const LUA_MULTRET: u32 = u32::MAX;

// Port of luaK_ret from lcode.c
pub fn ret(fs: &mut FuncState, first: u8, nret: u8) -> usize {
    code_abc(fs, OpCode::Return, first as u32, (nret + 1) as u32, 0)
}

// Port of luaK_jump from lcode.c. OpCode::Jmp is an isJ instruction (25-bit
// signed sJ field), not an iAsBx one -- must be coded/decoded with the sJ
// helpers or the offset silently corrupts on decode.
pub fn jump(fs: &mut FuncState) -> usize {
    code_sj(fs, OpCode::Jmp, -1)
}

// Port of luaK_jumpto from lcode.c
pub fn jumpto(fs: &mut FuncState, target: usize) {
    let pc = jump(fs);
    patchlist(fs, pc as isize, target as isize);
}

// Port of luaK_getlabel from lcode.c
pub fn get_label(fs: &FuncState) -> usize {
    fs.pc
}

// Alias matching the call-site spelling used by the statement parser.
pub fn getlabel(fs: &FuncState) -> usize {
    get_label(fs)
}

// Port of luaK_patchtohere from lcode.c
pub fn patchtohere(fs: &mut FuncState, list: isize) {
    let here = get_label(fs) as isize;
    patchlist(fs, list, here);
}

// Port of luaK_concat from lcode.c
pub fn concat(fs: &mut FuncState, l1: &mut isize, l2: isize) {
    if l2 == -1 {
        return;
    }
    if *l1 == -1 {
        *l1 = l2;
    } else {
        let mut list = *l1;
        let mut next = get_jump(fs, list as usize);
        while next != -1 {
            list = next;
            next = get_jump(fs, list as usize);
        }
        fix_jump(fs, list as usize, l2 as usize);
    }
}

// Port of luaK_patchlist from lcode.c
pub fn patchlist(fs: &mut FuncState, mut list: isize, target: isize) {
    if target == fs.pc as isize {
        patchtohere(fs, list);
    } else {
        while list != -1 {
            let next = get_jump(fs, list as usize);
            fix_jump(fs, list as usize, target as usize);
            list = next;
        }
    }
}

// Helper: get jump target from instruction (Jmp uses the sJ instruction format)
fn get_jump(fs: &FuncState, pc: usize) -> isize {
    if pc >= fs.chunk.code.len() {
        return -1;
    }
    let offset = Instruction::get_sj(fs.chunk.code[pc]);
    if offset == -1 {
        -1
    } else {
        (pc as isize) + 1 + (offset as isize)
    }
}

// Helper: patch jump instruction (Jmp uses the sJ instruction format)
pub fn fix_jump(fs: &mut FuncState, pc: usize, target: usize) {
    if pc >= fs.chunk.code.len() {
        return;
    }
    let offset = (target as isize) - (pc as isize) - 1;
    let max_sj = (Instruction::MAX_SJ >> 1) as isize;
    if offset < -(Instruction::OFFSET_SJ as isize) || offset > max_sj {
        // Error: jump too long
        return;
    }
    Instruction::set_sj(&mut fs.chunk.code[pc], offset as i32);
}

// Port of luaK_exp2nextreg from lcode.c
pub fn exp2nextreg(fs: &mut FuncState, e: &mut ExpDesc) -> u8 {
    discharge_vars(fs, e);
    free_exp(fs, e);
    reserve_regs(fs, 1);
    let reg = fs.freereg - 1;
    exp2reg(fs, e, reg);
    reg
}

// Port of luaK_exp2anyreg from lcode.c
pub fn exp2anyreg(fs: &mut FuncState, e: &mut ExpDesc) -> u8 {
    discharge_vars(fs, e);
    if e.kind == ExpKind::VNONRELOC {
        if !e.has_jumps() {
            return unsafe { e.u.info as u8 };
        }
        if unsafe { e.u.info } >= fs.nactvar as i32 {
            exp2reg(fs, e, unsafe { e.u.info as u8 });
            return unsafe { e.u.info as u8 };
        }
    }
    exp2nextreg(fs, e)
}

// Indexed variable/upvalue whose value isn't needed in any particular
// register: locals can stay put, everything else must be discharged.
pub fn exp2anyregup(fs: &mut FuncState, e: &mut ExpDesc) {
    if e.kind != ExpKind::VUPVAL || e.has_jumps() {
        exp2anyreg(fs, e);
    }
}

// Port of need_value from lcode.c. The real compiler special-cases jump
// lists whose tail is already a TESTSET (the boolean is stored as a side
// effect of the test itself); this compiler never emits TESTSET, so every
// non-empty jump list still needs an explicit LOADFALSE/LOADTRUE.
fn need_value(_fs: &FuncState, list: isize) -> bool {
    list != -1
}

// Port of patchlistaux from lcode.c, simplified for the same reason as
// need_value above: no jump list entry is ever a TESTSET that already holds
// the result, so every entry gets patched to `dtarget`.
fn patchlistaux(fs: &mut FuncState, list: isize, _vtarget: isize, dtarget: isize) {
    let mut list = list;
    while list != -1 {
        let next = get_jump(fs, list as usize);
        fix_jump(fs, list as usize, dtarget as usize);
        list = next;
    }
}

// Port of luaK_exp2reg from lcode.c
pub fn exp2reg(fs: &mut FuncState, e: &mut ExpDesc, reg: u8) {
    discharge2reg(fs, e, reg);
    if e.kind == ExpKind::VJMP {
        let info = unsafe { e.u.info as isize };
        concat(fs, &mut e.t, info);
    }
    if e.has_jumps() {
        let mut p_f: isize = -1;
        let mut p_t: isize = -1;
        if need_value(fs, e.t) || need_value(fs, e.f) {
            let fj = if e.kind == ExpKind::VJMP {
                -1
            } else {
                jump(fs) as isize
            };
            p_f = code_abc(fs, OpCode::LFalseSkip, reg as u32, 0, 0) as isize;
            p_t = code_abc(fs, OpCode::LoadTrue, reg as u32, 0, 0) as isize;
            patchtohere(fs, fj);
        }
        let final_label = get_label(fs) as isize;
        patchlistaux(fs, e.f, final_label, p_f);
        patchlistaux(fs, e.t, final_label, p_t);
    }
    e.f = -1;
    e.t = -1;
    e.kind = ExpKind::VNONRELOC;
    e.u.info = reg as i32;
}

// Port of luaK_exp2val from lcode.c
pub fn exp2val(fs: &mut FuncState, e: &mut ExpDesc) {
    if e.has_jumps() {
        exp2anyreg(fs, e);
    } else {
        discharge_vars(fs, e);
    }
}

// Find an existing constant equal to `value`, or add it. Dedups the same way
// string_k dedups string constants.
fn find_or_add_const(fs: &mut FuncState, value: LuaValue) -> usize {
    for (i, k) in fs.chunk.constants.iter().enumerate() {
        if k.raw_equal(&value, fs.pool) {
            return i;
        }
    }
    fs.chunk.constants.push(value);
    fs.chunk.constants.len() - 1
}

fn float_k(fs: &mut FuncState, nval: f64) -> usize {
    find_or_add_const(fs, LuaValue::float(nval))
}

// Port of dischargevars from lcode.c
pub fn discharge_vars(fs: &mut FuncState, e: &mut ExpDesc) {
    match e.kind {
        ExpKind::VLOCAL => {
            e.kind = ExpKind::VNONRELOC;
            e.u.info = unsafe { e.u.var.ridx as i32 };
        }
        ExpKind::VUPVAL => {
            let reg = fs.freereg;
            reserve_regs(fs, 1);
            code_abc(fs, OpCode::GetUpval, reg as u32, unsafe { e.u.info as u32 }, 0);
            e.kind = ExpKind::VNONRELOC;
            e.u.info = reg as i32;
        }
        ExpKind::VINDEXED => {
            let op = OpCode::GetTable;
            free_reg(fs, unsafe { e.u.ind.idx as u8 });
            free_reg(fs, unsafe { e.u.ind.t as u8 });
            let reg = fs.freereg;
            reserve_regs(fs, 1);
            code_abc(
                fs,
                op,
                reg as u32,
                unsafe { e.u.ind.t as u32 },
                unsafe { e.u.ind.idx as u32 },
            );
            e.kind = ExpKind::VNONRELOC;
            e.u.info = reg as i32;
        }
        ExpKind::VINDEXUP => {
            let reg = fs.freereg;
            reserve_regs(fs, 1);
            code_abc(
                fs,
                OpCode::GetTabUp,
                reg as u32,
                unsafe { e.u.ind.t as u32 },
                unsafe { e.u.ind.idx as u32 },
            );
            e.kind = ExpKind::VNONRELOC;
            e.u.info = reg as i32;
        }
        ExpKind::VINDEXI => {
            free_reg(fs, unsafe { e.u.ind.t as u8 });
            let reg = fs.freereg;
            reserve_regs(fs, 1);
            code_abc(
                fs,
                OpCode::GetI,
                reg as u32,
                unsafe { e.u.ind.t as u32 },
                unsafe { e.u.ind.idx as u32 },
            );
            e.kind = ExpKind::VNONRELOC;
            e.u.info = reg as i32;
        }
        ExpKind::VINDEXSTR => {
            free_reg(fs, unsafe { e.u.ind.t as u8 });
            let reg = fs.freereg;
            reserve_regs(fs, 1);
            code_abc(
                fs,
                OpCode::GetField,
                reg as u32,
                unsafe { e.u.ind.t as u32 },
                unsafe { e.u.ind.idx as u32 },
            );
            e.kind = ExpKind::VNONRELOC;
            e.u.info = reg as i32;
        }
        ExpKind::VVARARG | ExpKind::VCALL => {
            setoneret(fs, e);
        }
        _ => {}
    }
}

// Port of discharge2reg from lcode.c
pub fn discharge2reg(fs: &mut FuncState, e: &mut ExpDesc, reg: u8) {
    discharge_vars(fs, e);
    match e.kind {
        ExpKind::VNIL => {
            code_abc(fs, OpCode::LoadNil, reg as u32, 0, 0);
        }
        ExpKind::VFALSE | ExpKind::VTRUE => {
            if e.kind == ExpKind::VTRUE {
                code_abc(fs, OpCode::LoadTrue, reg as u32, 0, 0);
            } else {
                code_abc(fs, OpCode::LoadFalse, reg as u32, 0, 0);
            }
        }
        ExpKind::VK => {
            code_abx(fs, OpCode::LoadK, reg as u32, unsafe { e.u.info as u32 });
        }
        ExpKind::VKFLT => {
            let idx = float_k(fs, unsafe { e.u.nval });
            code_abx(fs, OpCode::LoadK, reg as u32, idx as u32);
        }
        ExpKind::VKINT => {
            code_asbx(fs, OpCode::LoadI, reg as u32, unsafe { e.u.ival as i32 });
        }
        ExpKind::VNONRELOC => {
            if unsafe { e.u.info } != reg as i32 {
                code_abc(fs, OpCode::Move, reg as u32, unsafe { e.u.info as u32 }, 0);
            }
        }
        ExpKind::VRELOC => {
            let pc = unsafe { e.u.info as usize };
            Instruction::set_a(&mut fs.chunk.code[pc], reg as u32);
        }
        _ => {}
    }
    e.kind = ExpKind::VNONRELOC;
    e.u.info = reg as i32;
}

// Port of freeexp from lcode.c
pub fn free_exp(fs: &mut FuncState, e: &ExpDesc) {
    if e.kind == ExpKind::VNONRELOC {
        free_reg(fs, unsafe { e.u.info as u8 });
    }
}

// Port of freereg from lcode.c
pub fn free_reg(fs: &mut FuncState, reg: u8) {
    if reg >= fs.nactvar && reg < fs.freereg {
        fs.freereg -= 1;
    }
}

// Port of reserveregs from lcode.c
pub fn reserve_regs(fs: &mut FuncState, n: u8) {
    fs.freereg += n;
    if (fs.freereg as usize) > fs.chunk.max_stack_size {
        fs.chunk.max_stack_size = fs.freereg as usize;
    }
}

// Port of luaK_nil from lcode.c
pub fn nil(fs: &mut FuncState, from: u8, n: u8) {
    if n > 0 {
        code_abc(fs, OpCode::LoadNil, from as u32, (n - 1) as u32, 0);
    }
}

// Port of luaK_setoneret from lcode.c
pub fn setoneret(fs: &mut FuncState, e: &mut ExpDesc) {
    if e.kind == ExpKind::VCALL {
        e.kind = ExpKind::VNONRELOC;
        let pc = unsafe { e.u.info as usize };
        Instruction::set_c(&mut fs.chunk.code[pc], 2);
    } else if e.kind == ExpKind::VVARARG {
        let pc = unsafe { e.u.info as usize };
        Instruction::set_c(&mut fs.chunk.code[pc], 2);
        e.kind = ExpKind::VRELOC;
    }
}

// Port of hasmultret from lcode.c (`#define hasmultret(k) ((k) == VCALL || (k) == VVARARG)`)
pub fn hasmultret(e: &ExpDesc) -> bool {
    matches!(e.kind, ExpKind::VCALL | ExpKind::VVARARG)
}

// Port of luaK_setreturns from lcode.c
pub fn setreturns(fs: &mut FuncState, e: &mut ExpDesc, nresults: u8) {
    let pc = unsafe { e.u.info as usize };
    match e.kind {
        ExpKind::VCALL => {
            Instruction::set_c(&mut fs.chunk.code[pc], (nresults as u32) + 1);
        }
        ExpKind::VVARARG => {
            Instruction::set_c(&mut fs.chunk.code[pc], (nresults as u32) + 1);
            Instruction::set_a(&mut fs.chunk.code[pc], fs.freereg as u32);
            reserve_regs(fs, 1);
        }
        _ => {}
    }
}

// Port of luaK_setmultret from lcode.c. Kept distinct from setreturns
// (rather than calling it with LUA_MULTRET) since the real sentinel is
// encoded as a C field of 0, which doesn't round-trip through a u8 count.
pub fn setmultret(fs: &mut FuncState, e: &mut ExpDesc) {
    let pc = unsafe { e.u.info as usize };
    match e.kind {
        ExpKind::VCALL => {
            Instruction::set_c(&mut fs.chunk.code[pc], 0);
        }
        ExpKind::VVARARG => {
            Instruction::set_c(&mut fs.chunk.code[pc], 0);
            Instruction::set_a(&mut fs.chunk.code[pc], fs.freereg as u32);
            reserve_regs(fs, 1);
        }
        _ => {}
    }
}

// Port of luaK_indexed from lcode.c, generalized to pick GetField/GetI/GetTabUp
// specializations the same way lparser.c's field-access helpers do, instead
// of always falling back to the generic register-keyed GetTable.
pub fn indexed(fs: &mut FuncState, t: &mut ExpDesc, k: &mut ExpDesc) {
    if t.kind == ExpKind::VUPVAL {
        let upval_idx = unsafe { t.u.info as i16 };
        match k.kind {
            ExpKind::VKSTR | ExpKind::VK => {
                let key_idx = unsafe { k.u.info };
                t.kind = ExpKind::VINDEXUP;
                t.u.ind.t = upval_idx;
                t.u.ind.idx = key_idx as i16;
                t.u.ind.keystr = key_idx as usize;
                return;
            }
            _ => {
                exp2anyreg(fs, t);
            }
        }
    }

    let table_reg = unsafe { t.u.info as i16 };
    match k.kind {
        ExpKind::VKSTR | ExpKind::VK => {
            let key_idx = unsafe { k.u.info };
            t.kind = ExpKind::VINDEXSTR;
            t.u.ind.t = table_reg;
            t.u.ind.idx = key_idx as i16;
            t.u.ind.keystr = key_idx as usize;
        }
        ExpKind::VKINT if unsafe { k.u.ival } >= 0 && unsafe { k.u.ival } <= Instruction::MAX_C as i64 => {
            let v = unsafe { k.u.ival as i16 };
            t.kind = ExpKind::VINDEXI;
            t.u.ind.t = table_reg;
            t.u.ind.idx = v;
        }
        _ => {
            let key_reg = exp2anyreg(fs, k);
            t.kind = ExpKind::VINDEXED;
            t.u.ind.t = table_reg;
            t.u.ind.idx = key_reg as i16;
        }
    }
}

// Port of luaK_self from lcode.c. `key_idx` is already an interned string
// constant index (the caller looked it up via string_k).
pub fn self_op(fs: &mut FuncState, e: &mut ExpDesc, key_idx: u8) {
    let ereg = exp2anyreg(fs, e);
    free_exp(fs, e);
    let reg = fs.freereg;
    reserve_regs(fs, 2);
    code_abck(fs, OpCode::Self_, reg as u32, ereg as u32, key_idx as u32, true);
    e.kind = ExpKind::VNONRELOC;
    e.u.info = reg as i32;
}

// Port of luaK_setlist from lcode.c
pub fn setlist(fs: &mut FuncState, table_reg: u8, na: u32, tostore: u32) {
    let b = if tostore == LUA_MULTRET { 0 } else { tostore };
    code_abc(fs, OpCode::SetList, table_reg as u32, b, na);
    fs.freereg = table_reg + 1;
}

// Reserves the ExtraArg slot that may later be filled in by settablesize.
pub fn code_extraarg(fs: &mut FuncState, ax: u32) -> usize {
    code_ax(fs, OpCode::ExtraArg, ax)
}

// Port of luaO_ceillog2 from lobject.c
fn ceil_log2(x: u32) -> u32 {
    if x <= 1 {
        return 0;
    }
    let mut x = x - 1;
    let mut log = 0u32;
    while x > 0 {
        x >>= 1;
        log += 1;
    }
    log
}

// Port of luaK_settablesize from lcode.c: patches a previously-emitted
// NewTable (and its trailing ExtraArg) with the constructor's size hints.
pub fn settablesize(fs: &mut FuncState, pc: usize, table_reg: u8, na: u32, nh: u32) {
    let b = if nh != 0 { ceil_log2(nh) + 1 } else { 0 };
    {
        let instr = &mut fs.chunk.code[pc];
        Instruction::set_a(instr, table_reg as u32);
        Instruction::set_b(instr, b);
    }
    if na <= Instruction::MAX_C {
        Instruction::set_c(&mut fs.chunk.code[pc], na);
    } else {
        Instruction::set_c(&mut fs.chunk.code[pc], 0);
        Instruction::set_k(&mut fs.chunk.code[pc], true);
        Instruction::set_ax(&mut fs.chunk.code[pc + 1], na);
    }
}

// Port of a restricted luaK_exp2const: only folds expressions that are
// already known at compile time with no pending jump lists.
pub fn exp2const(fs: &FuncState, e: &ExpDesc) -> Option<LuaValue> {
    if e.has_jumps() {
        return None;
    }
    match e.kind {
        ExpKind::VNIL => Some(LuaValue::nil()),
        ExpKind::VTRUE => Some(LuaValue::boolean(true)),
        ExpKind::VFALSE => Some(LuaValue::boolean(false)),
        ExpKind::VKINT => Some(LuaValue::integer(unsafe { e.u.ival })),
        ExpKind::VKFLT => Some(LuaValue::float(unsafe { e.u.nval })),
        ExpKind::VK => fs.chunk.constants.get(unsafe { e.u.info as usize }).cloned(),
        _ => None,
    }
}

// Port of luaK_fixline from lcode.c. This compiler doesn't yet stamp a line
// number per emitted instruction, so this only tracks the function's
// current source line for whichever part of codegen consults it.
pub fn fixline(fs: &mut FuncState, line: usize) {
    fs.line = line;
}

// RK-operand resolution for code_abrk: constants are interned and coded
// with the k bit set, everything else is forced into a register.
fn const_rk_index(fs: &mut FuncState, e: &mut ExpDesc) -> (u32, bool) {
    match e.kind {
        ExpKind::VK | ExpKind::VKSTR => (unsafe { e.u.info as u32 }, true),
        ExpKind::VNIL => (find_or_add_const(fs, LuaValue::nil()) as u32, true),
        ExpKind::VTRUE => (find_or_add_const(fs, LuaValue::boolean(true)) as u32, true),
        ExpKind::VFALSE => (find_or_add_const(fs, LuaValue::boolean(false)) as u32, true),
        ExpKind::VKINT => {
            let v = unsafe { e.u.ival };
            (find_or_add_const(fs, LuaValue::integer(v)) as u32, true)
        }
        ExpKind::VKFLT => {
            let v = unsafe { e.u.nval };
            (float_k(fs, v) as u32, true)
        }
        _ => (exp2anyreg(fs, e) as u32, false),
    }
}

// This codebase's ABCk encoding stores an RK operand directly in the C
// field with the k bit distinguishing register vs. constant, unlike
// classical Lua 5.1-5.3's single-bit-in-operand trick.
pub fn code_abrk(fs: &mut FuncState, op: OpCode, a: u32, b: u32, value: &mut ExpDesc) -> usize {
    let (c, k) = const_rk_index(fs, value);
    code_abck(fs, op, a, b, c, k)
}

// Port of negatecondition from lcode.c: flips the sense of the most recently
// emitted test instruction (the Jmp right after it is unaffected).
fn negatecondition(fs: &mut FuncState, e: &ExpDesc) {
    let pc = unsafe { e.u.info as usize };
    let k = Instruction::get_k(fs.chunk.code[pc]);
    Instruction::set_k(&mut fs.chunk.code[pc], !k);
}

// Port of condjump from lcode.c
fn condjump(fs: &mut FuncState, op: OpCode, a: u32, b: u32, c: u32, k: bool) -> isize {
    code_abck(fs, op, a, b, c, k);
    jump(fs) as isize
}

// Port of jumponcond from lcode.c
fn jumponcond(fs: &mut FuncState, e: &mut ExpDesc, cond: bool) -> isize {
    if e.kind == ExpKind::VRELOC {
        let pc = unsafe { e.u.info as usize };
        if Instruction::get_opcode(fs.chunk.code[pc]) == OpCode::Not {
            let b = Instruction::get_b(fs.chunk.code[pc]);
            fs.chunk.code.pop();
            fs.pc -= 1;
            return condjump(fs, OpCode::Test, b, 0, 0, !cond);
        }
    }
    let reg = exp2anyreg(fs, e);
    free_exp(fs, e);
    condjump(fs, OpCode::Test, reg as u32, 0, 0, cond)
}

// Port of luaK_goiftrue from lcode.c
pub fn goiftrue(fs: &mut FuncState, e: &mut ExpDesc) {
    discharge_vars(fs, e);
    let pc: isize = match e.kind {
        ExpKind::VJMP => {
            negatecondition(fs, e);
            unsafe { e.u.info as isize }
        }
        ExpKind::VK | ExpKind::VKFLT | ExpKind::VKINT | ExpKind::VKSTR | ExpKind::VTRUE => -1,
        _ => jumponcond(fs, e, false),
    };
    concat(fs, &mut e.f, pc);
    patchtohere(fs, e.t);
    e.t = -1;
}

// Port of luaK_goiffalse from lcode.c
pub fn goiffalse(fs: &mut FuncState, e: &mut ExpDesc) {
    discharge_vars(fs, e);
    let pc: isize = match e.kind {
        ExpKind::VJMP => unsafe { e.u.info as isize },
        ExpKind::VNIL | ExpKind::VFALSE => -1,
        _ => jumponcond(fs, e, true),
    };
    concat(fs, &mut e.t, pc);
    patchtohere(fs, e.f);
    e.f = -1;
}

// Port of codenot from lcode.c
fn codenot(fs: &mut FuncState, e: &mut ExpDesc) {
    discharge_vars(fs, e);
    match e.kind {
        ExpKind::VNIL | ExpKind::VFALSE => {
            e.kind = ExpKind::VTRUE;
        }
        ExpKind::VK | ExpKind::VKFLT | ExpKind::VKINT | ExpKind::VKSTR | ExpKind::VTRUE => {
            e.kind = ExpKind::VFALSE;
        }
        ExpKind::VJMP => {
            negatecondition(fs, e);
        }
        ExpKind::VRELOC | ExpKind::VNONRELOC => {
            let reg = exp2anyreg(fs, e);
            free_exp(fs, e);
            let pc = code_abc(fs, OpCode::Not, 0, reg as u32, 0);
            *e = ExpDesc::new_reloc(pc);
        }
        _ => unreachable!("codenot: unexpected expression kind"),
    }
    std::mem::swap(&mut e.f, &mut e.t);
}

// Port of luaK_prefix from lcode.c. `op` is already the resolved unary
// OpCode (the caller maps UnaryOperator -> OpCode before calling this).
pub fn prefix(fs: &mut FuncState, op: OpCode, e: &mut ExpDesc) {
    discharge_vars(fs, e);
    match op {
        OpCode::Unm => {
            if e.kind == ExpKind::VKINT {
                let v = unsafe { e.u.ival };
                if v != i64::MIN {
                    *e = ExpDesc::new_int(-v);
                    return;
                }
            } else if e.kind == ExpKind::VKFLT {
                let v = unsafe { e.u.nval };
                *e = ExpDesc::new_float(-v);
                return;
            }
        }
        OpCode::BNot => {
            if e.kind == ExpKind::VKINT {
                let v = unsafe { e.u.ival };
                *e = ExpDesc::new_int(!v);
                return;
            }
        }
        OpCode::Not => {
            codenot(fs, e);
            return;
        }
        _ => {}
    }
    let reg = exp2anyreg(fs, e);
    free_exp(fs, e);
    let pc = code_abc(fs, op, 0, reg as u32, 0);
    *e = ExpDesc::new_reloc(pc);
}

// Port of luaK_infix from lcode.c
pub fn infix(fs: &mut FuncState, op: BinaryOperator, v: &mut ExpDesc) {
    match op {
        BinaryOperator::OpAnd => goiftrue(fs, v),
        BinaryOperator::OpOr => goiffalse(fs, v),
        BinaryOperator::OpConcat => {
            exp2nextreg(fs, v);
        }
        BinaryOperator::OpAdd
        | BinaryOperator::OpSub
        | BinaryOperator::OpMul
        | BinaryOperator::OpMod
        | BinaryOperator::OpPow
        | BinaryOperator::OpDiv
        | BinaryOperator::OpIDiv
        | BinaryOperator::OpBAnd
        | BinaryOperator::OpBOr
        | BinaryOperator::OpBXor
        | BinaryOperator::OpShl
        | BinaryOperator::OpShr => {
            if !v.is_numeral() {
                exp2anyreg(fs, v);
            }
        }
        _ => {
            exp2anyreg(fs, v);
        }
    }
}

fn tonum(e: &ExpDesc) -> f64 {
    match e.kind {
        ExpKind::VKINT => unsafe { e.u.ival as f64 },
        ExpKind::VKFLT => unsafe { e.u.nval },
        _ => 0.0,
    }
}

// Port of constfolding from lcode.c, restricted to the arithmetic operators
// (order/equality comparisons are never constant-folded here).
fn constfolding_arith(op: BinaryOperator, e1: &ExpDesc, e2: &ExpDesc) -> Option<ExpDesc> {
    if !e1.is_numeral() || !e2.is_numeral() {
        return None;
    }
    if e1.kind == ExpKind::VKINT && e2.kind == ExpKind::VKINT {
        let a = unsafe { e1.u.ival };
        let b = unsafe { e2.u.ival };
        let result = match op {
            BinaryOperator::OpAdd => a.checked_add(b),
            BinaryOperator::OpSub => a.checked_sub(b),
            BinaryOperator::OpMul => a.checked_mul(b),
            BinaryOperator::OpBAnd => Some(a & b),
            BinaryOperator::OpBOr => Some(a | b),
            BinaryOperator::OpBXor => Some(a ^ b),
            BinaryOperator::OpShl => Some(ishift(a, b)),
            BinaryOperator::OpShr => Some(ishift(a, -b)),
            BinaryOperator::OpIDiv if b != 0 => Some(a.div_euclid(b)),
            BinaryOperator::OpMod if b != 0 => Some(a.rem_euclid(b)),
            _ => None,
        };
        return result.map(ExpDesc::new_int);
    }
    let a = tonum(e1);
    let b = tonum(e2);
    let result = match op {
        BinaryOperator::OpAdd => Some(a + b),
        BinaryOperator::OpSub => Some(a - b),
        BinaryOperator::OpMul => Some(a * b),
        BinaryOperator::OpDiv => Some(a / b),
        BinaryOperator::OpPow => Some(a.powf(b)),
        BinaryOperator::OpIDiv if b != 0.0 => Some((a / b).floor()),
        BinaryOperator::OpMod if b != 0.0 => Some(a - (a / b).floor() * b),
        _ => None,
    };
    result.map(ExpDesc::new_float)
}

// Port of luaV_shiftl from lvm.c: a left shift by a negative count is a
// right shift, and counts at or beyond the width yield zero.
fn ishift(a: i64, b: i64) -> i64 {
    if b <= -64 || b >= 64 {
        0
    } else if b >= 0 {
        ((a as u64) << b) as i64
    } else {
        ((a as u64) >> -b) as i64
    }
}

// Port of codearith from lcode.c's general (non-folded) path
fn codearith(fs: &mut FuncState, op: BinaryOperator, e1: &mut ExpDesc, e2: &mut ExpDesc) {
    let opcode = match op {
        BinaryOperator::OpAdd => OpCode::Add,
        BinaryOperator::OpSub => OpCode::Sub,
        BinaryOperator::OpMul => OpCode::Mul,
        BinaryOperator::OpMod => OpCode::Mod,
        BinaryOperator::OpPow => OpCode::Pow,
        BinaryOperator::OpDiv => OpCode::Div,
        BinaryOperator::OpIDiv => OpCode::IDiv,
        BinaryOperator::OpBAnd => OpCode::BAnd,
        BinaryOperator::OpBOr => OpCode::BOr,
        BinaryOperator::OpBXor => OpCode::BXor,
        BinaryOperator::OpShl => OpCode::Shl,
        BinaryOperator::OpShr => OpCode::Shr,
        _ => unreachable!("codearith: not an arithmetic operator"),
    };
    let r1 = exp2anyreg(fs, e1);
    let r2 = exp2anyreg(fs, e2);
    free_exp(fs, e2);
    free_exp(fs, e1);
    let pc = code_abc(fs, opcode, 0, r1 as u32, r2 as u32);
    *e1 = ExpDesc::new_reloc(pc);
}

// Port of codeeq from lcode.c
fn codeeq(fs: &mut FuncState, op: BinaryOperator, e1: &mut ExpDesc, e2: &mut ExpDesc) {
    let r1 = exp2anyreg(fs, e1);
    let r2 = exp2anyreg(fs, e2);
    free_exp(fs, e2);
    free_exp(fs, e1);
    let k = op == BinaryOperator::OpEq;
    code_abck(fs, OpCode::Eq, r1 as u32, r2 as u32, 0, k);
    let jpc = jump(fs) as i32;
    e1.kind = ExpKind::VJMP;
    e1.u = ExpUnion {
        info: jpc,
        ..Default::default()
    };
    e1.t = -1;
    e1.f = -1;
}

// Port of codeorder from lcode.c. `a > b`/`a >= b` are coded as `b < a`/`b <= a`.
fn codeorder(fs: &mut FuncState, op: BinaryOperator, e1: &mut ExpDesc, e2: &mut ExpDesc) {
    let (opcode, swap) = match op {
        BinaryOperator::OpLt => (OpCode::Lt, false),
        BinaryOperator::OpLe => (OpCode::Le, false),
        BinaryOperator::OpGt => (OpCode::Lt, true),
        BinaryOperator::OpGe => (OpCode::Le, true),
        _ => unreachable!("codeorder: not an order operator"),
    };
    let (ra, rb) = if swap {
        let rb = exp2anyreg(fs, e2);
        let ra = exp2anyreg(fs, e1);
        free_exp(fs, e1);
        free_exp(fs, e2);
        (ra, rb)
    } else {
        let ra = exp2anyreg(fs, e1);
        let rb = exp2anyreg(fs, e2);
        free_exp(fs, e2);
        free_exp(fs, e1);
        (ra, rb)
    };
    code_abck(fs, opcode, ra as u32, rb as u32, 0, true);
    let jpc = jump(fs) as i32;
    e1.kind = ExpKind::VJMP;
    e1.u = ExpUnion {
        info: jpc,
        ..Default::default()
    };
    e1.t = -1;
    e1.f = -1;
}

// Port of luaK_posfix from lcode.c
pub fn posfix(fs: &mut FuncState, op: BinaryOperator, e1: &mut ExpDesc, e2: &mut ExpDesc) {
    match op {
        BinaryOperator::OpAnd => {
            // e1->t must already be closed (luaK_infix discharged it via goiftrue)
            concat(fs, &mut e2.f, e1.f);
            *e1 = e2.clone();
        }
        BinaryOperator::OpOr => {
            concat(fs, &mut e2.t, e1.t);
            *e1 = e2.clone();
        }
        BinaryOperator::OpConcat => {
            exp2val(fs, e2);
            exp2nextreg(fs, e2);
            let r1 = unsafe { e1.u.info as u32 };
            free_exp(fs, e2);
            free_exp(fs, e1);
            let pc = code_abc(fs, OpCode::Concat, r1, 2, 0);
            *e1 = ExpDesc::new_reloc(pc);
        }
        BinaryOperator::OpAdd
        | BinaryOperator::OpSub
        | BinaryOperator::OpMul
        | BinaryOperator::OpMod
        | BinaryOperator::OpPow
        | BinaryOperator::OpDiv
        | BinaryOperator::OpIDiv
        | BinaryOperator::OpBAnd
        | BinaryOperator::OpBOr
        | BinaryOperator::OpBXor
        | BinaryOperator::OpShl
        | BinaryOperator::OpShr => {
            if let Some(folded) = constfolding_arith(op, e1, e2) {
                *e1 = folded;
            } else {
                codearith(fs, op, e1, e2);
            }
        }
        BinaryOperator::OpEq | BinaryOperator::OpNe => codeeq(fs, op, e1, e2),
        BinaryOperator::OpLt | BinaryOperator::OpLe | BinaryOperator::OpGt | BinaryOperator::OpGe => {
            codeorder(fs, op, e1, e2)
        }
        BinaryOperator::OpNop => {}
    }
}

// Port of the Lua 5.5 'global' statement's redeclaration check: reads the
// current value and raises unless it is nil, per ErrNNil's own semantics
// ("raise error if R[A] ~= nil (K[Bx - 1] is global name)").
pub fn codecheckglobal(fs: &mut FuncState, var: &mut ExpDesc, k: usize, line: usize) {
    let reg = exp2anyreg(fs, var);
    code_abx(fs, OpCode::ErrNNil, reg as u32, (k + 1) as u32);
    free_exp(fs, var);
    fixline(fs, line);
}
