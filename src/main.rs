fn main() {
    copa::driver::main()
}
